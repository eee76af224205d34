use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}
