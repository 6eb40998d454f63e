//! Pipeline behaviour against simulated browsers: enumeration, stubs on
//! navigation failure, bounded concurrency, and a full run to CSV.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::Instant;

use refstat_lib::application::{DetailHarvester, HarvestCoordinator, HarvestUseCases, LinkEnumerator};
use refstat_lib::domain::{DateRange, FederationId, LinkTask};
use refstat_lib::infrastructure::browser::{BrowserContext, FixtureBrowser, FixturePage};
use refstat_lib::infrastructure::config::{HarvestConfig, TimingConfig};
use refstat_lib::infrastructure::network_filter::{NetworkFilter, ResourceKind};
use refstat_lib::infrastructure::parsing::{CompiledProfile, SiteProfile};

const BASE: &str = "https://stats.example.se";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
}

fn profile() -> Arc<CompiledProfile> {
    Arc::new(SiteProfile::refstat().with_base_url(BASE).compile().unwrap())
}

fn listing_url(federation: u16, date: NaiveDate) -> String {
    format!("{}/forbund/{}/livematches/{}", BASE, federation, date)
}

fn detail_url(id: u32) -> String {
    format!("{}/sasong/43/serie/41140/match/{}/laguppstallning", BASE, id)
}

fn listing_page(ids: &[u32]) -> String {
    let anchors: String = ids
        .iter()
        .map(|id| format!(r#"<a href="/sasong/43/serie/41140/match/{}">match {}</a>"#, id, id))
        .collect();
    format!(r#"<html><body><div class="x9FBF">{}</div></body></html>"#, anchors)
}

fn detail_page(id: u32) -> String {
    format!(
        r#"<html><body>
            <div class="zrccf"><h1>Division 1 Norra</h1></div>
            <span class="d6aBe">Matchdatum: <strong>17 november 2025</strong></span>
            <span class="d6aBe">Matchstart: <strong>19:00</strong></span>
            <span class="d6aBe">Arena: <strong>Hall {id}</strong></span>
            <h3 class="QmXlT">Hemma {id}</h3><h3 class="QmXlT">Borta {id}</h3>
            <div class="FMsFg"><strong>Omgång 1</strong><strong>{id}</strong></div>
            <table><tr><td class="wMqhM"><a>Anna Domare</a></td><td class="wMqhM"><a>Bo Domare</a></td></tr></table>
        </body></html>"#
    )
}

fn enumerator(browser: FixtureBrowser) -> LinkEnumerator {
    LinkEnumerator::new(
        Arc::new(browser),
        profile(),
        Arc::new(NetworkFilter::default()),
        &TimingConfig::default(),
    )
}

fn harvester(timing: &TimingConfig) -> Arc<DetailHarvester> {
    Arc::new(DetailHarvester::new(profile(), Arc::new(NetworkFilter::default()), timing))
}

#[tokio::test(start_paused = true)]
async fn test_listing_with_three_qualifying_anchors() {
    let listing = format!(
        r#"<html><body><div class="x9FBF">
            <a href="/sasong/43/serie/41140/match/1">A - B</a>
            <a href="/sasong/43/serie/41140">Serien</a>
            <a href="/sasong/43/serie/41140/match/2/">C - D</a>
            <a href="https://www.google.com/maps?q=hall">Karta</a>
            <a href="{}/sasong/43/serie/41140/match/3">E - F</a>
        </div></body></html>"#,
        BASE
    );
    let browser = FixtureBrowser::with_pages([(listing_url(21, day(17)), FixturePage::html(listing))]);

    let tasks = enumerator(browser)
        .enumerate(DateRange::single(day(17)), &[FederationId(21)])
        .await;

    let urls: Vec<&str> = tasks.iter().map(|t| t.detail_url.as_str()).collect();
    assert_eq!(urls, vec![detail_url(1), detail_url(2), detail_url(3)]);
    assert!(tasks.iter().all(|t| t.date == Some(day(17)) && t.federation_id == Some(FederationId(21))));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_link_across_federations_and_days_yields_one_task() {
    let browser = FixtureBrowser::with_pages([
        (listing_url(21, day(17)), FixturePage::html(listing_page(&[10, 11]))),
        (listing_url(5, day(17)), FixturePage::html(listing_page(&[11, 12]))),
        (listing_url(21, day(18)), FixturePage::html(listing_page(&[10]))),
        (listing_url(5, day(18)), FixturePage::html(listing_page(&[]))),
    ]);

    let tasks = enumerator(browser)
        .enumerate(DateRange::new(day(17), day(18)), &[FederationId(21), FederationId(5)])
        .await;

    let urls: Vec<&str> = tasks.iter().map(|t| t.detail_url.as_str()).collect();
    assert_eq!(urls, vec![detail_url(10), detail_url(11), detail_url(12)]);
    // First-seen origin is kept
    assert_eq!(tasks[1].federation_id, Some(FederationId(21)));
    assert_eq!(tasks[2].federation_id, Some(FederationId(5)));
}

#[tokio::test(start_paused = true)]
async fn test_failed_and_hanging_listings_contribute_nothing() {
    let browser = FixtureBrowser::with_pages([
        (listing_url(21, day(17)), FixturePage::failing("net::ERR_NAME_NOT_RESOLVED")),
        (listing_url(21, day(18)), FixturePage::hanging()),
        (listing_url(21, day(19)), FixturePage::html(listing_page(&[7]))),
    ]);
    let started = Instant::now();

    let tasks = enumerator(browser.clone())
        .enumerate(DateRange::new(day(17), day(20)), &[FederationId(21)])
        .await;

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].date, Some(day(19)));
    // Only the hanging listing waits out its navigation timeout
    let bound = TimingConfig::default().listing_navigation_timeout();
    assert!(started.elapsed() >= bound);
    assert!(started.elapsed() < bound + Duration::from_secs(1));
    assert_eq!(browser.stats().opened, browser.stats().closed);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_timeout_yields_stub_within_bound() {
    let url = detail_url(42);
    let browser = FixtureBrowser::with_pages([(url.clone(), FixturePage::hanging())]);
    let timing = TimingConfig::default();
    let task = LinkTask::new(day(17), FederationId(21), url);
    let started = Instant::now();

    let record = harvester(&timing).harvest(&browser, &task).await;

    assert!(record.is_stub());
    assert_eq!(record.source_url, format!("{}/sasong/43/serie/41140/match/42", BASE));
    assert_eq!(record.federation_id, Some(FederationId(21)));
    assert!(started.elapsed() <= timing.navigation_timeout() + Duration::from_millis(1));
    assert_eq!(browser.stats().closed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded_by_the_gate() {
    let load = Duration::from_secs(3);
    let ids: Vec<u32> = (1..=10).collect();
    let browser = FixtureBrowser::with_pages(
        ids.iter()
            .map(|&id| (detail_url(id), FixturePage::html(detail_page(id)).with_latency(load))),
    );
    let tasks: Vec<LinkTask> = ids.iter().map(|&id| LinkTask::from_url(detail_url(id))).collect();
    let timing = TimingConfig::default();
    let started = Instant::now();

    let records = HarvestCoordinator::new(harvester(&timing), 2)
        .harvest_all(Arc::new(browser.clone()), tasks)
        .await;

    let elapsed = started.elapsed();
    assert_eq!(records.len(), 10);
    assert!(records.iter().all(|r| r.has_referees()));
    // ceil(10 / 2) rounds of one page load each
    assert!(elapsed >= load * 5, "elapsed {:?}", elapsed);
    assert!(elapsed < load * 6, "elapsed {:?}", elapsed);
    assert_eq!(browser.stats().max_in_flight, 2);
    assert_eq!(browser.stats().closed, 10);
}

#[tokio::test(start_paused = true)]
async fn test_filter_is_installed_on_detail_pages() {
    let url = detail_url(5);
    let browser = FixtureBrowser::with_pages([(
        url.clone(),
        FixturePage::html(detail_page(5))
            .with_resource("https://x.googletagmanager.com/gtag.js", ResourceKind::Script)
            .with_resource(format!("{}/static/app.js", BASE), ResourceKind::Script)
            .with_resource(format!("{}/static/crest", BASE), ResourceKind::Image),
    )]);

    let record = harvester(&TimingConfig::default())
        .harvest(&browser, &LinkTask::from_url(url))
        .await;

    assert_eq!(record.venue.as_deref(), Some("Hall 5"));
    assert_eq!(
        browser.blocked_requests(),
        vec![
            "https://x.googletagmanager.com/gtag.js".to_string(),
            format!("{}/static/crest", BASE),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_full_run_writes_one_row_per_link() {
    let mut pages = vec![(listing_url(21, day(17)), FixturePage::html(listing_page(&[1, 2, 3])))];
    pages.push((detail_url(1), FixturePage::html(detail_page(1))));
    pages.push((detail_url(2), FixturePage::failing("net::ERR_CONNECTION_RESET")));
    pages.push((detail_url(3), FixturePage::html(detail_page(3))));
    let browser: Arc<dyn BrowserContext> = Arc::new(FixtureBrowser::with_pages(pages));

    let config = HarvestConfig {
        base_url: Some(BASE.to_string()),
        ..HarvestConfig::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("matches.csv");

    let summary = HarvestUseCases::new(config, browser)
        .unwrap()
        .run_full(DateRange::single(day(17)), &output)
        .await
        .unwrap();

    assert_eq!((summary.links, summary.records, summary.stubs, summary.with_referees), (3, 3, 1, 2));

    let csv = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[1],
        format!(
            "2025-11-17,19:00,Division 1 Norra,Hemma 1,Borta 1,Hall 1,1,Anna Domare,Bo Domare,{}/sasong/43/serie/41140/match/1",
            BASE
        )
    );
    assert_eq!(lines[2], format!(",,,,,,,,,{}/sasong/43/serie/41140/match/2", BASE));
}
