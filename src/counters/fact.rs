use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

/// Side-effect client producing a fact about a number.
pub trait FactClient: Send + Sync {
    fn fetch(&self, number: i64) -> BoxFuture<'static, String>;
}

/// Local stand-in for a number-facts service.
#[derive(Debug, Clone, Default)]
pub struct NumberFactClient {
    delay: Duration,
}

impl NumberFactClient {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl FactClient for NumberFactClient {
    fn fetch(&self, number: i64) -> BoxFuture<'static, String> {
        let delay = self.delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            format!("{} is a good number.", number)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_formats_fact() {
        let client = NumberFactClient::new(Duration::from_millis(1));
        assert_eq!(client.fetch(7).await, "7 is a good number.");
    }
}
