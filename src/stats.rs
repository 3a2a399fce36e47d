//! Aggregate statistics over the clean table.
//!
//! Each function is independent and total: rows that lack the needed value
//! (null timestamp, missing author, non-numeric count) are excluded from
//! that aggregate rather than failing it.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Timelike};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::constants::stats::ENGAGEMENT_COLUMNS;
use crate::data::CleanPost;
use crate::types::{AuthorName, DomainName, Token};

/// Post counts bucketed by calendar date, hour of day, and weekday.
#[derive(Clone, Debug, Default)]
pub struct ActivityTables {
    /// Posts per calendar date, ascending by date.
    pub daily: Vec<(NaiveDate, u64)>,
    /// Posts per hour of day (0-23), ascending by hour.
    pub hourly: Vec<(u32, u64)>,
    /// Posts per weekday (0 = Monday), ascending by weekday.
    pub weekday: Vec<(u32, u64)>,
}

/// Rows with a null timestamp are excluded from all three buckets.
pub fn activity(rows: &[CleanPost]) -> ActivityTables {
    let mut daily: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut hourly: BTreeMap<u32, u64> = BTreeMap::new();
    let mut weekday: BTreeMap<u32, u64> = BTreeMap::new();
    for row in rows {
        let Some(at) = row.post.posted_at else {
            continue;
        };
        *daily.entry(at.date()).or_default() += 1;
        *hourly.entry(at.hour()).or_default() += 1;
        *weekday.entry(at.weekday().num_days_from_monday()).or_default() += 1;
    }
    ActivityTables {
        daily: daily.into_iter().collect(),
        hourly: hourly.into_iter().collect(),
        weekday: weekday.into_iter().collect(),
    }
}

/// Per-author rollup row.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorStats {
    /// Author display name.
    pub author: AuthorName,
    /// Post count.
    pub posts: u64,
    /// Mean recommend count over numeric values, `None` when all missing.
    pub avg_recommend: Option<f64>,
    /// Mean view count over numeric values, `None` when all missing.
    pub avg_view: Option<f64>,
}

/// Group by author, sorted by post count descending. Rows without an author
/// are excluded; ties keep first-encountered order.
pub fn authors(rows: &[CleanPost]) -> Vec<AuthorStats> {
    struct Acc {
        posts: u64,
        rec_sum: i64,
        rec_n: u64,
        view_sum: i64,
        view_n: u64,
    }
    let mut groups: IndexMap<AuthorName, Acc> = IndexMap::new();
    for row in rows {
        let Some(author) = row.post.author.clone() else {
            continue;
        };
        let acc = groups.entry(author).or_insert(Acc {
            posts: 0,
            rec_sum: 0,
            rec_n: 0,
            view_sum: 0,
            view_n: 0,
        });
        acc.posts += 1;
        if let Some(rec) = row.post.recommend_count {
            acc.rec_sum += rec;
            acc.rec_n += 1;
        }
        if let Some(views) = row.post.view_count {
            acc.view_sum += views;
            acc.view_n += 1;
        }
    }
    let mut table: Vec<AuthorStats> = groups
        .into_iter()
        .map(|(author, acc)| AuthorStats {
            author,
            posts: acc.posts,
            avg_recommend: mean(acc.rec_sum, acc.rec_n),
            avg_view: mean(acc.view_sum, acc.view_n),
        })
        .collect();
    table.sort_by(|a, b| b.posts.cmp(&a.posts));
    table
}

fn mean(sum: i64, n: u64) -> Option<f64> {
    if n == 0 {
        None
    } else {
        Some(sum as f64 / n as f64)
    }
}

/// Rows sorted by recommend count then view count, both descending, missing
/// values last; bounded to `limit`.
pub fn top_posts(rows: &[CleanPost], limit: usize) -> Vec<&CleanPost> {
    let mut ranked: Vec<&CleanPost> = rows.iter().collect();
    ranked.sort_by(|a, b| {
        let key = |row: &CleanPost| {
            (
                row.post.recommend_count.unwrap_or(i64::MIN),
                row.post.view_count.unwrap_or(i64::MIN),
            )
        };
        key(b).cmp(&key(a))
    });
    ranked.truncate(limit);
    ranked
}

/// Global token frequency, top `limit` by count descending. Ties keep
/// first-encountered order.
pub fn token_frequency(rows: &[CleanPost], limit: usize) -> Vec<(Token, u64)> {
    let mut counts: IndexMap<Token, u64> = IndexMap::new();
    for row in rows {
        for token in &row.tokens {
            *counts.entry(token.clone()).or_default() += 1;
        }
    }
    top_n(counts, limit)
}

/// Adjacent-pair frequency, top `limit`. Pairs are counted within each
/// row's token sequence only and never span rows.
pub fn bigram_frequency(rows: &[CleanPost], limit: usize) -> Vec<(String, u64)> {
    let mut counts: IndexMap<String, u64> = IndexMap::new();
    for row in rows {
        for pair in row.tokens.windows(2) {
            *counts.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1;
        }
    }
    top_n(counts, limit)
}

static BODY_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s)"']+"#).unwrap());

/// Outbound-domain frequency from raw (pre-normalization) body text, top
/// `limit` hosts. Unparseable URL-shaped substrings are skipped.
pub fn domain_frequency(rows: &[CleanPost], limit: usize) -> Vec<(DomainName, u64)> {
    let mut counts: IndexMap<DomainName, u64> = IndexMap::new();
    for row in rows {
        let Some(body) = row.post.body.as_deref() else {
            continue;
        };
        for hit in BODY_URL.find_iter(body) {
            let Ok(parsed) = Url::parse(hit.as_str()) else {
                continue;
            };
            let Some(host) = parsed.host_str() else {
                continue;
            };
            *counts.entry(host.to_lowercase()).or_default() += 1;
        }
    }
    top_n(counts, limit)
}

/// Stable top-N: count descending, insertion (first-encountered) order on ties.
fn top_n<K>(counts: IndexMap<K, u64>, limit: usize) -> Vec<(K, u64)> {
    let mut entries: Vec<(K, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(limit);
    entries
}

/// Pairwise Pearson correlation matrix over the engagement columns.
#[derive(Clone, Debug)]
pub struct CorrelationMatrix {
    /// Column labels, in order.
    pub labels: Vec<&'static str>,
    /// `values[i][j]` is the correlation of column `i` with column `j`;
    /// `NaN` when fewer than two complete pairs exist or a column is constant.
    pub values: Vec<Vec<f64>>,
}

/// Correlate views, recommends, comments, and the three proxy counts.
/// Each pair uses only rows where both values are numeric.
pub fn engagement_correlation(rows: &[CleanPost]) -> CorrelationMatrix {
    let columns: Vec<Vec<Option<f64>>> = ENGAGEMENT_COLUMNS
        .iter()
        .enumerate()
        .map(|(idx, _)| rows.iter().map(|row| engagement_value(row, idx)).collect())
        .collect();

    let size = columns.len();
    let mut values = vec![vec![f64::NAN; size]; size];
    for i in 0..size {
        for j in i..size {
            let r = pearson(&columns[i], &columns[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix {
        labels: ENGAGEMENT_COLUMNS.to_vec(),
        values,
    }
}

fn engagement_value(row: &CleanPost, column: usize) -> Option<f64> {
    match column {
        0 => row.post.view_count.map(|v| v as f64),
        1 => row.post.recommend_count.map(|v| v as f64),
        2 => row.post.comment_count.map(|v| v as f64),
        3 => Some(f64::from(row.pos_hits)),
        4 => Some(f64::from(row.neg_hits)),
        _ => Some(f64::from(row.laugh_hits)),
    }
}

/// Pearson r over rows where both columns are present; `NaN` when undefined.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}
