use super::blocking_queries;
use super::schema::{AccessLog, CountryCount, DeviceTypeCount, HourlyCount, NewAccessLog};
use crate::Result;
use deadpool_sqlite::Pool;

pub async fn insert(new: NewAccessLog, pool: &Pool) -> Result<AccessLog> {
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::insert(&new, conn))
        .await?
}

pub async fn select_page(
    limit: i64,
    offset: i64,
    ascending: bool,
    pool: &Pool,
) -> Result<Vec<AccessLog>> {
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::select_page(limit, offset, ascending, conn))
        .await?
}

pub async fn select_all_newest_first(pool: &Pool) -> Result<Vec<AccessLog>> {
    pool.get()
        .await?
        .interact(|conn| blocking_queries::select_all_newest_first(conn))
        .await?
}

pub async fn count_total(pool: &Pool) -> Result<i64> {
    pool.get()
        .await?
        .interact(|conn| blocking_queries::count_total(conn))
        .await?
}

pub async fn count_today(pool: &Pool) -> Result<i64> {
    pool.get()
        .await?
        .interact(|conn| blocking_queries::count_today(conn))
        .await?
}

pub async fn count_distinct_ips(pool: &Pool) -> Result<i64> {
    pool.get()
        .await?
        .interact(|conn| blocking_queries::count_distinct_ips(conn))
        .await?
}

pub async fn avg_response_time(pool: &Pool) -> Result<i64> {
    pool.get()
        .await?
        .interact(|conn| blocking_queries::avg_response_time(conn))
        .await?
}

pub async fn hourly_trend(pool: &Pool) -> Result<Vec<HourlyCount>> {
    pool.get()
        .await?
        .interact(|conn| blocking_queries::hourly_trend(conn))
        .await?
}

pub async fn count_by_device_type(pool: &Pool) -> Result<Vec<DeviceTypeCount>> {
    pool.get()
        .await?
        .interact(|conn| blocking_queries::count_by_device_type(conn))
        .await?
}

pub async fn top_countries(limit: i64, pool: &Pool) -> Result<Vec<CountryCount>> {
    pool.get()
        .await?
        .interact(move |conn| blocking_queries::top_countries(limit, conn))
        .await?
}

pub async fn delete_all(pool: &Pool) -> Result<i64> {
    pool.get()
        .await?
        .interact(|conn| blocking_queries::delete_all(conn))
        .await?
}
