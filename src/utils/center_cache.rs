use crate::model::center::Center;
use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

pub const CENTER_COLUMNS: &str = "id, name, address, phone, email, capacity, opening_time";

/// Centers are read on every sign-in for the lateness check.
static CENTER_CACHE: Lazy<Cache<u64, Center>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(600))
        .build()
});

/// Cached lookup, falling back to the database on a miss.
pub async fn get(pool: &MySqlPool, center_id: u64) -> Result<Option<Center>, sqlx::Error> {
    if let Some(center) = CENTER_CACHE.get(&center_id).await {
        return Ok(Some(center));
    }

    let center = sqlx::query_as::<_, Center>(&format!(
        "SELECT {} FROM centers WHERE id = ?",
        CENTER_COLUMNS
    ))
    .bind(center_id)
    .fetch_optional(pool)
    .await?;

    if let Some(c) = &center {
        CENTER_CACHE.insert(c.id, c.clone()).await;
    }

    Ok(center)
}

pub async fn put(center: &Center) {
    CENTER_CACHE.insert(center.id, center.clone()).await;
}

/// Drop a center after it was updated or deleted.
pub async fn invalidate(center_id: u64) {
    CENTER_CACHE.invalidate(&center_id).await;
}

/// Load every center into the cache at startup.
pub async fn warmup_center_cache(pool: &MySqlPool) -> Result<()> {
    let sql = format!("SELECT {} FROM centers", CENTER_COLUMNS);
    let mut stream = sqlx::query_as::<_, Center>(&sql).fetch(pool);

    let mut total = 0usize;
    while let Some(row) = stream.next().await {
        let center = row?;
        put(&center).await;
        total += 1;
    }

    log::info!("Center cache warmup complete: {} centers", total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::center::default_opening_time;

    fn center(id: u64) -> Center {
        Center {
            id,
            name: format!("Center {id}"),
            address: "1 Road".into(),
            phone: "000".into(),
            email: format!("c{id}@x.com"),
            capacity: 10,
            opening_time: default_opening_time(),
        }
    }

    #[actix_web::test]
    async fn put_then_invalidate() {
        let c = center(90_001);
        put(&c).await;
        assert_eq!(
            CENTER_CACHE.get(&c.id).await.map(|c| c.name),
            Some("Center 90001".to_string())
        );

        invalidate(c.id).await;
        assert!(CENTER_CACHE.get(&c.id).await.is_none());
    }

    #[actix_web::test]
    async fn cached_center_is_served_without_touching_the_pool() {
        let c = center(90_002);
        put(&c).await;
        // a lazy pool never connects unless a query runs
        let pool = MySqlPool::connect_lazy("mysql://nobody@127.0.0.1:1/none").unwrap();
        let found = get(&pool, c.id).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(90_002));
    }
}
