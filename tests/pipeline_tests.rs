mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::{TempDir, tempdir};

use common::{FakeChannel, FakeFetcher, listing_page};
use trm_affiliate::application::links::LinkRow;
use trm_affiliate::application::pipeline::{
    PublishOptions, PublishOutcome, run_collect_with, run_links, run_publish, run_publish_with, run_report,
};
use trm_affiliate::domain::product::{PRODUCT_COLUMNS, Product};
use trm_affiliate::domain::report::ReportRow;
use trm_affiliate::domain::sku::derive_sku;
use trm_affiliate::infrastructure::config::{CategoryRate, PipelineConfig};
use trm_affiliate::infrastructure::csv_store::{CsvOptions, read_table, write_table};
use trm_affiliate::infrastructure::post_log::PostLog;

fn config_in(dir: &TempDir) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    let root = dir.path();
    config.paths.categories = root.join("categories.txt");
    config.paths.products = root.join("products.csv");
    config.paths.report = root.join("report.csv");
    config.paths.links = root.join("links.csv");
    config.paths.post_log = root.join("posted.json");
    config.collector.request_delay_ms = 0;
    config.collector.page_query_param = String::new();
    config.publisher.message_delay_ms = 0;
    config.telegram.bot_token = None;
    config.telegram.chat_id = None;
    config
}

fn product(name: &str, price: Option<&str>, url: &str, category: &str) -> Product {
    Product {
        name: name.to_string(),
        price: price.map(str::to_string),
        url: url.to_string(),
        image: None,
        source_category: category.to_string(),
        sku: None,
    }
}

fn write_products(path: &Path, products: &[Product]) {
    write_table(path, &PRODUCT_COLUMNS, products, CsvOptions::default()).unwrap();
}

#[test]
fn test_report_computes_commission_and_stable_sku() {
    let dir = tempdir().unwrap();
    let mut config = config_in(&dir);
    config.commission.default_rate = 20.0;
    write_products(
        &config.paths.products,
        &[product("Acer B", Some("89.90"), "https://x/b", "https://x/elektronik")],
    );

    let stats = run_report(&config).unwrap();
    assert_eq!(stats.rows, 1);
    assert_eq!(stats.unpriced, 0);

    let rows: Vec<ReportRow> = read_table(&config.paths.report).unwrap();
    assert_eq!(rows[0].price, Some(89.90));
    assert_eq!(rows[0].commission_rate, 20.0);
    assert_eq!(rows[0].estimated_commission, 17.98);
    assert_eq!(rows[0].sku, derive_sku("https://x/b", "Acer B"));

    // A second run over the same input yields the same SKU
    run_report(&config).unwrap();
    let again: Vec<ReportRow> = read_table(&config.paths.report).unwrap();
    assert_eq!(again, rows);
}

#[test]
fn test_report_cells_use_fixed_decimals() {
    let dir = tempdir().unwrap();
    let mut config = config_in(&dir);
    config.commission.default_rate = 20.0;
    write_products(
        &config.paths.products,
        &[product("Acer B", Some("89.90"), "https://x/b", "c")],
    );

    run_report(&config).unwrap();

    let text = fs::read_to_string(&config.paths.report).unwrap();
    let data_line = text.lines().nth(1).unwrap();
    assert!(data_line.contains(",89.90,20.0,17.98,https://x/b,"), "{data_line}");
}

#[test]
fn test_category_override_and_unparseable_price() {
    let dir = tempdir().unwrap();
    let mut config = config_in(&dir);
    config.commission.category_rates = vec![CategoryRate {
        pattern: "Kozmetik".to_string(),
        rate: 15.0,
    }];
    write_products(
        &config.paths.products,
        &[
            product("Ruj", Some("200"), "https://x/ruj", "https://x/kozmetik/dudak"),
            product("Kalem", Some("Fiyat sorunuz"), "https://x/kalem", "https://x/kirtasiye"),
        ],
    );

    let stats = run_report(&config).unwrap();
    assert_eq!(stats.unpriced, 1);

    let rows: Vec<ReportRow> = read_table(&config.paths.report).unwrap();
    assert_eq!(rows[0].commission_rate, 15.0);
    assert_eq!(rows[0].estimated_commission, 30.0);
    assert_eq!(rows[1].price, None);
    assert_eq!(rows[1].commission_rate, 10.0);
    assert_eq!(rows[1].estimated_commission, 0.0);
}

#[test]
fn test_unicode_names_survive_the_tables() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir);
    let name = "Şık Çanta – İğne Ölçü Gümüş ₺";
    write_products(
        &config.paths.products,
        &[product(name, Some("1299.00"), "https://x/canta", "c")],
    );

    run_report(&config).unwrap();
    run_links(&config).unwrap();

    let rows: Vec<ReportRow> = read_table(&config.paths.report).unwrap();
    assert_eq!(rows[0].name, name);
    let links: Vec<LinkRow> = read_table(&config.paths.links).unwrap();
    assert_eq!(links[0].name, name);
}

#[tokio::test]
async fn test_empty_category_list_writes_header_only() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir);
    fs::write(&config.paths.categories, "# nothing yet\n\n").unwrap();
    let fetcher = Arc::new(FakeFetcher::default());

    let summary = run_collect_with(&config, fetcher.clone()).await.unwrap();

    assert!(summary.products.is_empty());
    assert!(fetcher.requested().is_empty());
    let text = fs::read_to_string(&config.paths.products).unwrap();
    let text = text.trim_start_matches('\u{feff}');
    assert_eq!(text.lines().collect::<Vec<_>>(), ["name,price,url,image,source_category,sku"]);
}

#[tokio::test]
async fn test_collect_report_publish_end_to_end() {
    let dir = tempdir().unwrap();
    let mut config = config_in(&dir);
    config.commission.default_rate = 20.0;
    fs::write(&config.paths.categories, "https://shop.test/telefon\n").unwrap();
    let fetcher = Arc::new(FakeFetcher::default().page(
        "https://shop.test/telefon",
        listing_page(
            &[("Acer A", "1.299,00 TL", "/urun-a"), ("Acer B", "89,90 TL", "/urun-b")],
            None,
        ),
    ));

    run_collect_with(&config, fetcher).await.unwrap();
    let products: Vec<Product> = read_table(&config.paths.products).unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].price.as_deref(), Some("1299.00"));

    run_report(&config).unwrap();

    let channel = Arc::new(FakeChannel::default());
    let outcome = run_publish_with(&config, channel.clone(), PublishOptions::default())
        .await
        .unwrap();
    let PublishOutcome::Posted(summary) = outcome else {
        panic!("expected individual posts, got {outcome:?}");
    };
    assert_eq!(summary.sent, 2);
    assert!(channel.delivered()[1].body().contains("17.98 ₺"));

    let log = PostLog::load(&config.paths.post_log).unwrap();
    assert_eq!(log.ids(), ["https://shop.test/urun-a", "https://shop.test/urun-b"]);

    // Nothing new on a second run
    let channel = Arc::new(FakeChannel::default());
    run_publish_with(&config, channel.clone(), PublishOptions::default())
        .await
        .unwrap();
    assert_eq!(channel.attempts(), 0);
}

#[tokio::test]
async fn test_batch_size_option_overrides_config() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir);
    write_products(
        &config.paths.products,
        &[
            product("A", Some("10"), "https://x/a", "c"),
            product("B", Some("20"), "https://x/b", "c"),
            product("C", Some("30"), "https://x/c", "c"),
        ],
    );
    run_report(&config).unwrap();

    let channel = Arc::new(FakeChannel::default());
    let options = PublishOptions {
        digest: false,
        batch_size: Some(1),
    };
    let outcome = run_publish_with(&config, channel.clone(), options).await.unwrap();

    assert!(matches!(outcome, PublishOutcome::Posted(summary) if summary.sent == 1 && summary.deferred == 2));
}

#[tokio::test]
async fn test_digest_option_sends_summary() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir);
    write_products(
        &config.paths.products,
        &[product("Acer B", Some("89.90"), "https://x/b", "c")],
    );
    run_report(&config).unwrap();

    let channel = Arc::new(FakeChannel::default());
    let options = PublishOptions {
        digest: true,
        batch_size: None,
    };
    let outcome = run_publish_with(&config, channel.clone(), options).await.unwrap();

    assert!(matches!(outcome, PublishOutcome::Digest { parts: 1 }));
    let body = channel.delivered()[0].body().to_string();
    assert!(body.starts_with("<b>TRM Günlük Ürün Özeti</b>"), "{body}");
    assert!(!config.paths.post_log.exists());
}

#[tokio::test]
async fn test_publish_without_credentials_is_skipped() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir);
    write_products(&config.paths.products, &[product("A", Some("10"), "https://x/a", "c")]);
    run_report(&config).unwrap();

    let outcome = run_publish(&config, PublishOptions::default()).await.unwrap();

    assert!(matches!(outcome, PublishOutcome::Skipped));
    assert!(!config.paths.post_log.exists());
}

#[test]
fn test_links_step() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir);
    write_products(
        &config.paths.products,
        &[
            product("Acer B", Some("89.90"), "https://x/b", "c"),
            product("  ", None, "https://x/bos", "c"),
        ],
    );

    let written = run_links(&config).unwrap();

    assert_eq!(written, 1);
    let links: Vec<LinkRow> = read_table(&config.paths.links).unwrap();
    assert_eq!(
        links[0].utm_link,
        "https://x/b?utm_source=telegram&utm_medium=bot&utm_campaign=trm"
    );
}

#[test]
fn test_missing_product_table_yields_empty_report() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir);

    let stats = run_report(&config).unwrap();

    assert_eq!(stats.rows, 0);
    assert!(config.paths.report.exists());
}
