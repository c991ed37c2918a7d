const AGENT_NAME: &str = "AGENT_NAME";

const DEFAULT_NAME: &str = "sensor-gpio";

pub fn get_agent_name() -> String {
    let name_from_env = std::env::var(AGENT_NAME);
    name_from_env.unwrap_or_else(|_| DEFAULT_NAME.to_string())
}

const BUS_ENDPOINT: &str = "BUS_ENDPOINT";

const DEFAULT_ENDPOINT: &str = "inproc://gpio-monitoring";

pub fn get_endpoint() -> String {
    let endpoint_from_env = std::env::var(BUS_ENDPOINT);
    endpoint_from_env.unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string())
}
