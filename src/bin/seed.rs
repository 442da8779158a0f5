//! Seed script for development: populates a fresh database with sample data.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires the `DATABASE_URL` environment variable (reads .env).

use adrules::models::advertiser::Network;
use adrules::models::rule::RuleValue;
use anyhow::Context;
use sqlx::PgPool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = adrules::db::create_pool(&db_url, 5).await?;

    // Run migrations first
    adrules::db::run_migrations(&pool).await?;

    println!("=== adrules Seed Script ===");

    seed_sites(&pool).await?;
    seed_advertisers(&pool).await?;
    seed_rules(&pool).await?;

    println!("\n=== Seed complete! ===");
    Ok(())
}

async fn seed_sites(pool: &PgPool) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sites")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        println!("[skip] Sites already exist ({count})");
        return Ok(());
    }

    let sites = [
        ("Garden Weekly", "gardenweekly.example", true),
        ("Outdoor Gear Lab", "outdoorgearlab.example", true),
        ("Tech Deals Daily", "techdealsdaily.example", true),
        ("Retired Recipes", "retiredrecipes.example", false),
    ];

    for (name, domain, active) in sites {
        sqlx::query(
            "INSERT INTO sites (name, domain, wordpress_url, is_active) VALUES ($1, $2, $3, $4)",
        )
        .bind(name)
        .bind(domain)
        .bind(format!("https://{domain}/wp-json"))
        .bind(active)
        .execute(pool)
        .await?;
    }

    println!("[done] Created {} sample sites", sites.len());
    Ok(())
}

async fn seed_advertisers(pool: &PgPool) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM advertisers")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        println!("[skip] Advertisers already exist ({count})");
        return Ok(());
    }

    // "Trailhead Outfitters" appears on two networks: the grid flags it as a duplicate.
    let advertisers: [(Network, &str, &str, &str, f64, Option<i32>); 10] = [
        (Network::Awin, "1001", "Trailhead Outfitters", "Outdoor", 0.42, Some(8)),
        (Network::Cj, "55120", "Trailhead Outfitters", "Outdoor", 0.37, None),
        (Network::Awin, "1002", "Bloom & Root", "Garden", 0.18, Some(4)),
        (Network::Flexoffers, "fx-771", "Circuit Hub", "Electronics", 1.12, Some(10)),
        (Network::Flexoffers, "fx-772", "Seedling Supply Co", "Garden", 0.09, None),
        (Network::Impact, "imp-9001", "Summit Tents", "Outdoor", 0.66, Some(6)),
        (Network::Impact, "imp-9002", "PixelPeak Monitors", "Electronics", 0.88, None),
        (Network::Cj, "55121", "Kitchen Craft Direct", "Home", 0.25, Some(2)),
        (Network::Cj, "55122", "River Run Kayaks", "Outdoor", 0.51, None),
        (Network::Awin, "1003", "Budget Bytes Store", "", 0.04, None),
    ];

    for (i, &(network, network_id, name, category, epc, weight)) in
        advertisers.iter().enumerate()
    {
        let clicks = 250 * (i as i64 + 1);
        sqlx::query(
            "INSERT INTO advertisers (network, network_advertiser_id, name, website_url, category,
             total_clicks, total_revenue, epc, commission_rate, default_weight, is_active,
             last_synced_at)
             VALUES ($1, $2, $3, $4, NULLIF($5, ''), $6, $7, $8, $9, $10, $11, NOW())",
        )
        .bind(network)
        .bind(network_id)
        .bind(name)
        .bind(format!(
            "https://www.{}.example",
            name.to_lowercase().replace(|c: char| !c.is_ascii_alphanumeric(), "")
        ))
        .bind(category)
        .bind(clicks)
        .bind(clicks as f64 * epc)
        .bind(epc)
        .bind(Some(4.0 + i as f64))
        .bind(weight)
        .bind(i != 9)
        .execute(pool)
        .await?;
    }

    println!("[done] Created {} sample advertisers", advertisers.len());
    Ok(())
}

async fn seed_rules(pool: &PgPool) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site_advertiser_rules")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        println!("[skip] Rules already exist ({count})");
        return Ok(());
    }

    let rules = [
        ("gardenweekly.example", "Bloom & Root", RuleValue::Allowed, None),
        (
            "gardenweekly.example",
            "Circuit Hub",
            RuleValue::Denied,
            Some("Off-topic for audience"),
        ),
        ("outdoorgearlab.example", "Summit Tents", RuleValue::Allowed, None),
        ("outdoorgearlab.example", "Kitchen Craft Direct", RuleValue::Default, None),
        ("techdealsdaily.example", "PixelPeak Monitors", RuleValue::Allowed, None),
    ];

    let mut written = 0u64;
    for (domain, advertiser, rule, reason) in rules {
        let result = sqlx::query(
            "INSERT INTO site_advertiser_rules (site_id, advertiser_id, rule, reason)
             SELECT s.id, a.id, $3, $4 FROM sites s, advertisers a
             WHERE s.domain = $1 AND a.name = $2
             ON CONFLICT (site_id, advertiser_id) DO NOTHING",
        )
        .bind(domain)
        .bind(advertiser)
        .bind(rule)
        .bind(reason)
        .execute(pool)
        .await?;
        written += result.rows_affected();
    }

    println!("[done] Created {written} sample rules");
    Ok(())
}
