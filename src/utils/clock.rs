use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Wall-clock time in the user's timezone. Reminders and "today" are both evaluated against
    /// it.
    fn local_now(&self) -> NaiveDateTime {
        self.time().with_timezone(&Local).naive_local()
    }

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: tokio::time::Instant);
}

#[derive(Clone, Copy)]
pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

#[cfg(test)]
pub mod test_clock {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use tokio::time::Instant;

    use super::Clock;

    /// Clock frozen at a given local moment until moved with [TestClock::set].
    #[derive(Clone)]
    pub struct TestClock {
        now: Arc<Mutex<NaiveDateTime>>,
    }

    impl TestClock {
        pub fn new(now: NaiveDateTime) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        pub fn set(&self, now: NaiveDateTime) {
            *self.now.lock().unwrap() = now;
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            Utc.from_utc_datetime(&self.now.lock().unwrap())
        }

        fn local_now(&self) -> NaiveDateTime {
            *self.now.lock().unwrap()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: tokio::time::Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }
}
