#[derive(Debug, Clone)]
pub struct ConnectionAttempt {
    pub port: u16,
    pub broker_host: String,
    pub client_id: String,
    pub keepalive_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connect,
    Protocol,
    Decode,
}

#[derive(Debug, Clone, Default)]
pub struct ProbeSummary {
    pub attempted_ports: Vec<u16>,
    pub connected_port: Option<u16>,
    pub cancelled: bool,
}
