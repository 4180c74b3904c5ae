use slotwatch_browser::{BrowserActions, BrowserEngine, Locator, SessionProvider};
use slotwatch_core::BrowserConfig;
use std::time::Duration;

fn headless() -> BrowserConfig {
    BrowserConfig {
        headless: true,
        ..BrowserConfig::default()
    }
}

#[tokio::test]
#[ignore = "Requires Chrome/Chromium installed"]
async fn test_browser_engine_creation() {
    let engine = BrowserEngine::launch(&headless(), Duration::from_millis(50)).await;
    assert!(engine.is_ok(), "Failed to create browser engine");
}

#[tokio::test]
#[ignore = "Requires Chrome/Chromium installed"]
async fn test_navigation_and_locators() {
    let engine = BrowserEngine::launch(&headless(), Duration::from_millis(50))
        .await
        .unwrap();
    let session = engine.open_session().await.unwrap();

    session
        .navigate("https://example.com", Duration::from_secs(30))
        .await
        .expect("navigation");

    let heading = Locator::with_text("h1", "example domain");
    assert!(session.is_visible(&heading).await.unwrap());
    assert!(!session
        .is_visible(&Locator::css("mat-select"))
        .await
        .unwrap());
    assert!(session.page_text().await.unwrap().contains("Example Domain"));

    engine.close_session(session).await;
    engine.shutdown().await;
}

#[tokio::test]
#[ignore = "Requires Chrome/Chromium installed"]
async fn test_sessions_are_isolated() {
    let engine = BrowserEngine::launch(&headless(), Duration::from_millis(50))
        .await
        .unwrap();

    let first = engine.open_session().await.unwrap();
    let second = engine.open_session().await.unwrap();
    first
        .navigate("https://example.com", Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(second.current_url().await.unwrap(), "about:blank");

    engine.close_session(first).await;
    engine.close_session(second).await;
    engine.shutdown().await;
}
