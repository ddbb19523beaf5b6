/// Nothing here is meant to be crawled.
pub async fn get_robots() -> &'static str { "User-agent: *\nDisallow: /\n" }
