use serde::{Deserialize, Serialize};

/// One configured stratum pool slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub url: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Default for PoolInfo {
    fn default() -> Self {
        PoolInfo {
            url: String::from("stratum.pool.io"),
            port: 3333,
            user: String::from("pool_username.real_worker"),
            password: String::from("123"),
        }
    }
}

impl PoolInfo {
    /// Full stratum URL, or an empty string for an unconfigured slot.
    pub fn full_url(&self) -> String {
        if self.url.is_empty() {
            String::new()
        } else {
            format!("stratum+tcp://{}:{}", self.url, self.port)
        }
    }

    /// A slot counts as active once both a host and a worker are configured.
    pub fn active(&self) -> bool {
        !self.url.is_empty() && !self.user.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_slot_is_active() {
        let pool = PoolInfo {
            url: String::from("h"),
            port: 3333,
            user: String::from("u"),
            password: String::new(),
        };
        assert_eq!(pool.full_url(), "stratum+tcp://h:3333");
        assert!(pool.active());
    }

    #[test]
    fn empty_url_means_inactive_slot() {
        let pool = PoolInfo {
            url: String::new(),
            port: 3333,
            user: String::from("x"),
            password: String::new(),
        };
        assert_eq!(pool.full_url(), "");
        assert!(!pool.active());
    }

    #[test]
    fn missing_worker_means_inactive_slot() {
        let pool = PoolInfo {
            user: String::new(),
            ..PoolInfo::default()
        };
        assert!(!pool.active());
    }
}
