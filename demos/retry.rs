use std::time::Duration;

use resilient_fetch::{FetchBuilder, FetchError, RetryPolicy};
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = FetchBuilder::from_env()?
        .path("/status/503")
        .timeout(Duration::from_secs(5))
        .retry(
            RetryPolicy::default()
                .max_retries(4)
                .initial_delay(Duration::from_millis(200))
                .on_retry(|retry, err, delay| {
                    eprintln!("retry #{retry} in {delay:?} after: {err}");
                }),
        )
        .transform(|value, response| {
            Ok(serde_json::json!({ "status": response.status.as_u16(), "body": value }))
        })
        .build()?;

    match client.execute::<Value>().await {
        Ok(value) => println!("{value:#}"),
        Err(FetchError::Http {
            status, message, ..
        }) => println!("gave up with status {status}: {message}"),
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
