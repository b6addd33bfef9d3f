use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::{HydrosatError, Result};
use crate::region::Region;

use super::{ImageryProvider, ImageryQuery, Scene};

/// Bounds every backend call by a timeout.
///
/// The call runs on a short-lived thread; if it has not answered in time the
/// caller gets `BackendTimeout` and the thread is left to finish on its own.
pub struct TimedProvider {
    inner: Arc<dyn ImageryProvider>,
    timeout: Duration,
}

impl TimedProvider {
    pub fn new(inner: Arc<dyn ImageryProvider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl ImageryProvider for TimedProvider {
    fn fetch_scenes(&self, region: &Region, query: &ImageryQuery) -> Result<Vec<Scene>> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let region = region.clone();
        let owned_query = query.clone();

        std::thread::Builder::new()
            .name("hydrosat-fetch".into())
            .spawn(move || {
                let _ = tx.send(inner.fetch_scenes(&region, &owned_query));
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    region = %query.region,
                    timeout_s = self.timeout.as_secs(),
                    "Imagery backend timed out"
                );
                Err(HydrosatError::BackendTimeout {
                    seconds: self.timeout.as_secs(),
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(HydrosatError::Backend(
                "fetch thread terminated without a result".to_string(),
            )),
        }
    }

    fn sensor(&self) -> &str {
        self.inner.sensor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;
    use crate::raster::ProductLevel;
    use chrono::NaiveDate;

    struct Stalled;

    impl ImageryProvider for Stalled {
        fn fetch_scenes(&self, _: &Region, _: &ImageryQuery) -> Result<Vec<Scene>> {
            std::thread::sleep(Duration::from_secs(5));
            Ok(Vec::new())
        }
    }

    struct Failing;

    impl ImageryProvider for Failing {
        fn fetch_scenes(&self, _: &Region, _: &ImageryQuery) -> Result<Vec<Scene>> {
            Err(HydrosatError::Backend("quota exceeded".into()))
        }
    }

    fn query() -> ImageryQuery {
        ImageryQuery {
            region: "test".into(),
            period: Period::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            )
            .unwrap(),
            max_cloud_pct: 30.0,
            product: ProductLevel::SurfaceReflectance,
        }
    }

    #[test]
    fn stalled_call_times_out() {
        let provider = TimedProvider::new(Arc::new(Stalled), Duration::from_millis(50));
        let region = Region::from_rect("test", (0.0, 0.0), (10.0, 10.0));
        let err = provider.fetch_scenes(&region, &query()).unwrap_err();
        assert_eq!(err.code(), "BACKEND_TIMEOUT");
    }

    #[test]
    fn backend_errors_pass_through() {
        let provider = TimedProvider::new(Arc::new(Failing), Duration::from_secs(1));
        let region = Region::from_rect("test", (0.0, 0.0), (10.0, 10.0));
        let err = provider.fetch_scenes(&region, &query()).unwrap_err();
        assert_eq!(err.code(), "BACKEND_ERROR");
        assert!(!err.safe_message().contains("quota"));
    }
}
