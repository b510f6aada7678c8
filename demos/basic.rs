use resilient_fetch::FetchBuilder;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Post {
    id: u64,
    title: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url = std::env::var("FETCH_BASE_URL")
        .unwrap_or_else(|_| "https://jsonplaceholder.typicode.com".to_owned());

    let client = FetchBuilder::json_api(base_url)
        .path("/posts")
        .query([("_limit", 5)])
        .build()?;

    let posts: Vec<Post> = client.execute().await?;
    for post in posts {
        println!("{:>3} {}", post.id, post.title);
    }

    Ok(())
}
