//! Crawl engine behavior against an in-memory site

use crate::support::{config, Behavior, MockSite};
use snapcrawl::url::RoutingMode;
use snapcrawl::{CrawlEngine, EngineState, SnapError, UnitOutcome, UnitState};
use std::time::Duration;
use tokio::sync::watch;

const BASE: &str = "http://site.test";

#[tokio::test]
async fn test_cyclic_links_are_fetched_once() {
    let (renderer, stats) = MockSite::new(BASE)
        .page("/", &["/a", "/b"])
        .page("/a", &["/", "/b", "/a/"])
        .page("/b", &["/a", "http://site.test/", "#top"])
        .renderer();

    let mut engine = CrawlEngine::new(&config(&format!("base-url = \"{}\"", BASE)), renderer).unwrap();
    let outcome = engine.run().await.unwrap();

    assert_eq!(engine.state(), EngineState::Complete);
    assert_eq!(outcome.units.len(), 3);
    assert!(outcome.units.iter().all(|u| u.state == UnitState::Done));
    assert_eq!(outcome.captured().count(), 3);

    assert_eq!(stats.opened().len(), 3);
    assert_eq!(stats.open_count("http://site.test/a"), 1);
    assert_eq!(stats.open_count("http://site.test/b"), 1);
}

#[tokio::test]
async fn test_depth_ceiling() {
    let (renderer, stats) = MockSite::new(BASE)
        .page("/", &["/one"])
        .page("/one", &["/two"])
        .page("/two", &["/three"])
        .page("/three", &[])
        .renderer();

    let config = config(&format!("base-url = \"{}\"\ndepth = 2", BASE));
    let outcome = CrawlEngine::new(&config, renderer).unwrap().run().await.unwrap();

    let depths: Vec<(&str, u32)> = outcome
        .units
        .iter()
        .map(|u| (u.url.as_str(), u.depth))
        .collect();
    assert_eq!(depths, vec![(BASE, 0), ("/one", 1), ("/two", 2)]);
    assert_eq!(stats.open_count("http://site.test/three"), 0);
}

#[tokio::test]
async fn test_rejected_links_are_not_crawled() {
    let (renderer, stats) = MockSite::new(BASE)
        .page(
            "/",
            &[
                "/about",
                "/admin/users",
                "https://elsewhere.test/page",
                "mailto:team@site.test",
                "/about?utm_source=feed",
            ],
        )
        .page("/about", &[])
        .page("/admin/users", &[])
        .renderer();

    let config = config(&format!("base-url = \"{}\"\nexclude = [\"^/admin\"]", BASE));
    let outcome = CrawlEngine::new(&config, renderer).unwrap().run().await.unwrap();

    assert_eq!(outcome.units.len(), 2);
    assert_eq!(outcome.units[1].url, "/about");
    assert_eq!(stats.open_count("http://site.test/admin/users"), 0);
    assert_eq!(stats.opened().len(), 2);
}

#[tokio::test]
async fn test_never_ready_page_times_out() {
    let (renderer, _stats) = MockSite::new(BASE)
        .page("/", &["/slow", "/fast"])
        .never_ready("/slow", &["/hidden"])
        .page("/fast", &[])
        .page("/hidden", &[])
        .renderer();

    let config = config(&format!(
        "base-url = \"{}\"\nready-selector = \"#app\"\nwait-delay = 200\npoll-interval = 20",
        BASE
    ));
    let outcome = CrawlEngine::new(&config, renderer).unwrap().run().await.unwrap();

    let slow = outcome.units.iter().find(|u| u.url == "/slow").unwrap();
    assert_eq!(slow.outcome, Some(UnitOutcome::TimedOut));
    assert!(slow.content.is_none());

    // Links of a page that never became ready are not followed
    assert!(outcome.units.iter().all(|u| u.url != "/hidden"));
    assert_eq!(outcome.count_outcome(UnitOutcome::Captured), 2);
    assert_eq!(outcome.count_outcome(UnitOutcome::TimedOut), 1);
}

#[tokio::test]
async fn test_base_never_ready_is_not_fatal() {
    let (renderer, _stats) = MockSite::new(BASE)
        .never_ready("/", &["/a"])
        .page("/a", &[])
        .renderer();

    let config = config(&format!(
        "base-url = \"{}\"\nready-selector = \"#app\"\nwait-delay = 100\npoll-interval = 20",
        BASE
    ));
    let outcome = CrawlEngine::new(&config, renderer).unwrap().run().await.unwrap();

    assert_eq!(outcome.units.len(), 1);
    assert_eq!(outcome.units[0].outcome, Some(UnitOutcome::TimedOut));
    assert_eq!(outcome.captured().count(), 0);
}

#[tokio::test]
async fn test_unreachable_base_fails_the_crawl() {
    let (renderer, _stats) = MockSite::new(BASE).page("/a", &[]).renderer();

    let result = CrawlEngine::new(&config(&format!("base-url = \"{}\"", BASE)), renderer)
        .unwrap()
        .run()
        .await;

    match result {
        Err(SnapError::BaseUnreachable { url, .. }) => assert_eq!(url, BASE),
        other => panic!("expected BaseUnreachable, got {:?}", other.map(|o| o.units.len())),
    }
}

#[tokio::test]
async fn test_unreachable_child_is_recorded() {
    let (renderer, _stats) = MockSite::new(BASE)
        .page("/", &["/gone", "/here"])
        .page("/here", &[])
        .renderer();

    let outcome = CrawlEngine::new(&config(&format!("base-url = \"{}\"", BASE)), renderer)
        .unwrap()
        .run()
        .await
        .unwrap();

    let gone = outcome.units.iter().find(|u| u.url == "/gone").unwrap();
    assert_eq!(gone.outcome, Some(UnitOutcome::OpenFailed));
    assert_eq!(outcome.captured().count(), 2);
}

#[tokio::test]
async fn test_concurrency_limit() {
    let delay = Duration::from_millis(30);
    let links: Vec<String> = (0..8).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    let mut site = MockSite::new(BASE).page("/", &link_refs);
    for link in &links {
        site = site.slow(link, &[], delay);
    }
    let (renderer, stats) = site.renderer();

    let config = config(&format!("base-url = \"{}\"\nmax-concurrent-pages = 2", BASE));
    let outcome = CrawlEngine::new(&config, renderer).unwrap().run().await.unwrap();

    assert_eq!(outcome.captured().count(), 9);
    assert!(stats.peak() <= 2, "peak was {}", stats.peak());
    assert_eq!(stats.peak(), 2);
}

#[tokio::test]
async fn test_shutdown_cancels_crawl() {
    let (renderer, _stats) = MockSite::new(BASE)
        .slow("/", &[], Duration::from_secs(10))
        .renderer();

    let config = config(&format!(
        "base-url = \"{}\"\nwait-delay = 30000\npoll-interval = 100",
        BASE
    ));

    let (tx, rx) = watch::channel(false);
    let mut engine = CrawlEngine::new(&config, renderer).unwrap().with_shutdown(rx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(true);
    });

    let result = tokio::time::timeout(Duration::from_secs(2), engine.run())
        .await
        .expect("cancellation is prompt");

    assert!(matches!(result, Err(SnapError::Cancelled)));
    assert_eq!(engine.state(), EngineState::Cancelled);
}

#[tokio::test]
async fn test_fragment_routes() {
    let routing = RoutingMode::FragmentBased {
        prefix: "!".to_string(),
    };
    let (renderer, stats) = MockSite::with_routing("http://site.test/", routing)
        .page("/", &["#!/people", "#!/people/sam", "#!/", "/legal", "#section"])
        .page("#!/people", &["#!/people/sam", "#!/people/"])
        .page("#!/people/sam", &[])
        .page("/legal", &[])
        .renderer();

    let config = config("base-url = \"http://site.test/\"\nfollow-fragment = true");
    let outcome = CrawlEngine::new(&config, renderer).unwrap().run().await.unwrap();

    let urls: Vec<&str> = outcome.units.iter().map(|u| u.url.as_str()).collect();
    assert_eq!(urls, vec!["http://site.test/", "#!/people", "#!/people/sam"]);
    assert_eq!(outcome.units[2].depth, 1);
    assert_eq!(stats.open_count("http://site.test/#!/people"), 1);
    assert_eq!(stats.open_count("http://site.test/legal"), 0);
}

#[tokio::test]
async fn test_hanging_extraction_times_out() {
    let (renderer, _stats) = MockSite::new(BASE)
        .page("/", &["/a", "/b"])
        .page("/a", &[])
        .misbehaving("/b", &["/c"], Behavior::HangOnExtract)
        .page("/c", &[])
        .renderer();

    let config = config(&format!(
        "base-url = \"{}\"\nwait-delay = 200\npoll-interval = 20",
        BASE
    ));
    let mut engine = CrawlEngine::new(&config, renderer).unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(3), engine.run())
        .await
        .expect("a hanging page does not stall the crawl")
        .unwrap();

    assert_eq!(engine.state(), EngineState::Complete);
    let hanging = outcome.units.iter().find(|u| u.url == "/b").unwrap();
    assert_eq!(hanging.state, UnitState::Done);
    assert_eq!(hanging.outcome, Some(UnitOutcome::TimedOut));
    assert!(outcome.units.iter().all(|u| u.url != "/c"));
    assert_eq!(outcome.captured().count(), 2);
}

#[tokio::test]
async fn test_panicking_task_leaves_unit_done() {
    let (renderer, _stats) = MockSite::new(BASE)
        .page("/", &["/a", "/b"])
        .misbehaving("/a", &["/hidden"], Behavior::PanicOnLinks)
        .page("/b", &[])
        .renderer();

    let mut engine = CrawlEngine::new(&config(&format!("base-url = \"{}\"", BASE)), renderer).unwrap();
    let outcome = engine.run().await.unwrap();

    assert_eq!(engine.state(), EngineState::Complete);
    assert!(outcome.units.iter().all(|u| u.state == UnitState::Done));

    let crashed = outcome.units.iter().find(|u| u.url == "/a").unwrap();
    assert_eq!(crashed.outcome, Some(UnitOutcome::TaskFailed));
    assert!(crashed.content.is_none());
    assert_eq!(outcome.captured().count(), 2);
    assert_eq!(outcome.counts.in_flight, 0);
}

#[tokio::test]
async fn test_panicking_base_task_fails_the_crawl() {
    let (renderer, _stats) = MockSite::new(BASE)
        .misbehaving("/", &["/a"], Behavior::PanicOnLinks)
        .page("/a", &[])
        .renderer();

    let mut engine = CrawlEngine::new(&config(&format!("base-url = \"{}\"", BASE)), renderer).unwrap();
    let result = engine.run().await;

    match result {
        Err(SnapError::TaskFailed { url, .. }) => assert_eq!(url, BASE),
        other => panic!("expected TaskFailed, got {:?}", other.map(|o| o.units.len())),
    }
    assert_ne!(engine.state(), EngineState::Complete);
}

#[tokio::test]
async fn test_slow_open_times_out_within_budget() {
    let (renderer, stats) = MockSite::new(BASE)
        .page("/", &["/slow"])
        .slow("/slow", &[], Duration::from_secs(10))
        .renderer();

    let config = config(&format!(
        "base-url = \"{}\"\nwait-delay = 100\npoll-interval = 20",
        BASE
    ));
    let outcome = tokio::time::timeout(
        Duration::from_secs(3),
        CrawlEngine::new(&config, renderer).unwrap().run(),
    )
    .await
    .expect("open honours the wait budget")
    .unwrap();

    let slow = outcome.units.iter().find(|u| u.url == "/slow").unwrap();
    assert_eq!(slow.outcome, Some(UnitOutcome::TimedOut));
    assert_eq!(stats.peak(), 1);
}
