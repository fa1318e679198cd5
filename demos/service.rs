use std::sync::Arc;
use std::time::Duration;

use domain_redirect::book::now_millis;
use domain_redirect::{
    logging, InMemoryEngine, RedirectError, RedirectService, ResourceType, RuleBook, RuleQuery,
    RuleStore,
};
use url::Url;

const LIST: &str = "\
# imported on startup
http://intranet.local -> https://portal.example.net
! https://paused.example.com -> https://elsewhere.example.com
";

#[tokio::main]
async fn main() -> Result<(), RedirectError> {
    dotenvy::dotenv().ok();

    let engine = Arc::new(InMemoryEngine::new());
    let (service, config) = RedirectService::from_env(Arc::clone(&engine)).await?;
    logging::init(&config.log_filter);
    let service = Arc::new(service);

    let serving = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.serve().await })
    };

    service
        .submit("https://old.example.com", "https://new.example.org:8443", now_millis())
        .await?;
    service.import_list(LIST, now_millis()).await?;

    tokio::time::sleep(Duration::from_millis(50)).await;

    let book = RuleBook::from_records(service.store().get_all().await?);
    let page = book.view(&RuleQuery::default().page_size(config.page_size));
    println!(
        "page {}/{} ({} rules)",
        page.page, page.total_pages, page.total_matches
    );
    for record in &page.records {
        let state = if record.enabled { "on " } else { "off" };
        println!("  [{state}] {} -> {}", record.source_domain, record.destination_domain);
    }

    for input in ["https://old.example.com/blog?id=7", "http://intranet.local/wiki"] {
        let Ok(url) = Url::parse(input) else {
            continue;
        };
        match engine.redirect(&url, ResourceType::MainFrame) {
            Some(target) => println!("{url} => {target}"),
            None => println!("{url} => (no redirect)"),
        }
    }

    serving.abort();
    Ok(())
}
