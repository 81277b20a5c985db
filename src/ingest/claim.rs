use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

fn claimed() -> &'static Mutex<HashSet<String>> {
    static CLAIMED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    CLAIMED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive, process-wide hold on a capture device.
///
/// Real cameras refuse a second open while a handle is live; the claim
/// gives every source the same behavior, including synthetic ones. The
/// claim is released on `release()` or drop, whichever comes first.
#[derive(Debug)]
pub struct DeviceClaim {
    device: Option<String>,
}

impl DeviceClaim {
    pub fn acquire(device: &str) -> Result<Self> {
        let mut set = claimed()
            .lock()
            .map_err(|_| anyhow!("device claim registry poisoned"))?;
        if !set.insert(device.to_string()) {
            return Err(anyhow!("device {} is already in use", device));
        }
        Ok(Self {
            device: Some(device.to_string()),
        })
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn is_held(&self) -> bool {
        self.device.is_some()
    }

    pub fn release(&mut self) {
        if let Some(device) = self.device.take() {
            match claimed().lock() {
                Ok(mut set) => {
                    set.remove(&device);
                }
                Err(poisoned) => {
                    poisoned.into_inner().remove(&device);
                }
            }
        }
    }
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        self.release();
    }
}

/// True while some source holds `device`.
pub fn is_claimed(device: &str) -> bool {
    claimed()
        .lock()
        .map(|set| set.contains(device))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_fails_until_release() -> Result<()> {
        let mut first = DeviceClaim::acquire("test://claim-a")?;
        assert!(DeviceClaim::acquire("test://claim-a").is_err());
        assert!(is_claimed("test://claim-a"));
        first.release();
        assert!(!first.is_held());
        assert!(!is_claimed("test://claim-a"));
        let _again = DeviceClaim::acquire("test://claim-a")?;
        Ok(())
    }

    #[test]
    fn drop_releases_claim() -> Result<()> {
        {
            let _claim = DeviceClaim::acquire("test://claim-b")?;
            assert!(is_claimed("test://claim-b"));
        }
        assert!(!is_claimed("test://claim-b"));
        Ok(())
    }
}
