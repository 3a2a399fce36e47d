//! Whole-file artifact persistence.
//!
//! Tables are always written wholesale and replaced on rebuild, never patched
//! in place. The canonical and clean tables keep the dump's Korean headers so
//! artifacts stay interchangeable with precomputed remote copies.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use csv::{StringRecord, Writer};
use parquet::data_type::{ByteArray, ByteArrayType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::{SerializedFileWriter, SerializedRowGroupWriter};
use parquet::schema::parser::parse_message_type;
use tracing::debug;

use crate::constants::merge as cols;
use crate::data::{non_empty, parse_count, parse_id, CleanPost, Post};
use crate::errors::PipelineError;
use crate::merge::parse_posted_at;
use crate::reader::{read_csv_bytes, ShardTable};
use crate::stats::{AuthorStats, CorrelationMatrix};

/// Canonical-table headers, in column order.
pub const CANONICAL_HEADERS: [&str; 13] = [
    cols::COL_ID,
    cols::COL_TITLE,
    cols::COL_TITLE_URL,
    cols::COL_COMMENTS,
    cols::COL_AUTHOR,
    cols::COL_AUTHOR_IP,
    cols::COL_VIEWS,
    cols::COL_RECOMMENDS,
    cols::COL_POSTED_AT,
    cols::COL_BODY,
    cols::COL_ATTACHMENTS,
    cols::COL_SOURCE,
    cols::COL_DATETIME,
];

/// Extra clean-table headers, appended after the canonical ones.
pub const CLEAN_EXTRA_HEADERS: [&str; 6] = [
    "clean_title",
    "clean_body",
    "pos_hits",
    "neg_hits",
    "laugh_hits",
    "tokens",
];

const DATETIME_OUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn csv_error(err: csv::Error) -> PipelineError {
    PipelineError::Artifact(format!("csv write failed: {err}"))
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn opt_num<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(T::to_string).unwrap_or_default()
}

fn post_fields(post: &Post) -> Vec<String> {
    vec![
        opt_num(&post.id),
        opt(&post.title).to_string(),
        opt(&post.title_url).to_string(),
        opt_num(&post.comment_count),
        opt(&post.author).to_string(),
        opt(&post.author_ip).to_string(),
        opt_num(&post.view_count),
        opt_num(&post.recommend_count),
        opt(&post.posted_at_raw).to_string(),
        opt(&post.body).to_string(),
        opt(&post.attachment_images).to_string(),
        post.source_shard.clone(),
        post.posted_at
            .map(|at| at.format(DATETIME_OUT_FORMAT).to_string())
            .unwrap_or_default(),
    ]
}

fn post_from_row(table: &ShardTable, row: &StringRecord) -> Post {
    let text = |column: &str| table.field(row, column).and_then(non_empty);
    Post {
        id: table.field(row, cols::COL_ID).and_then(parse_id),
        title: text(cols::COL_TITLE),
        title_url: text(cols::COL_TITLE_URL),
        comment_count: table.field(row, cols::COL_COMMENTS).and_then(parse_count),
        author: text(cols::COL_AUTHOR),
        author_ip: text(cols::COL_AUTHOR_IP),
        view_count: table.field(row, cols::COL_VIEWS).and_then(parse_count),
        recommend_count: table.field(row, cols::COL_RECOMMENDS).and_then(parse_count),
        posted_at_raw: text(cols::COL_POSTED_AT),
        posted_at: table
            .field(row, cols::COL_DATETIME)
            .and_then(parse_posted_at),
        body: text(cols::COL_BODY),
        attachment_images: text(cols::COL_ATTACHMENTS),
        source_shard: table
            .field(row, cols::COL_SOURCE)
            .unwrap_or_default()
            .to_string(),
    }
}

/// Write the canonical table, replacing any existing file.
pub fn write_canonical(path: &Path, posts: &[Post]) -> Result<(), PipelineError> {
    let mut writer = Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(CANONICAL_HEADERS).map_err(csv_error)?;
    for post in posts {
        writer.write_record(post_fields(post)).map_err(csv_error)?;
    }
    writer.flush()?;
    debug!("wrote canonical table: {} rows -> {}", posts.len(), path.display());
    Ok(())
}

/// Read the canonical table back from disk.
pub fn read_canonical(path: &Path) -> Result<Vec<Post>, PipelineError> {
    let bytes = fs::read(path)?;
    let table = read_csv_bytes(&path.to_string_lossy(), &bytes)?;
    Ok(table
        .rows()
        .iter()
        .map(|row| post_from_row(&table, row))
        .collect())
}

/// Write the clean table, replacing any existing file.
pub fn write_clean(path: &Path, rows: &[CleanPost]) -> Result<(), PipelineError> {
    let mut writer = Writer::from_path(path).map_err(csv_error)?;
    let headers: Vec<&str> = CANONICAL_HEADERS
        .iter()
        .chain(CLEAN_EXTRA_HEADERS.iter())
        .copied()
        .collect();
    writer.write_record(&headers).map_err(csv_error)?;
    for row in rows {
        let mut fields = post_fields(&row.post);
        fields.push(row.clean_title.clone());
        fields.push(row.clean_body.clone());
        fields.push(row.pos_hits.to_string());
        fields.push(row.neg_hits.to_string());
        fields.push(row.laugh_hits.to_string());
        fields.push(serde_json::to_string(&row.tokens).map_err(|err| {
            PipelineError::Artifact(format!("token column encoding failed: {err}"))
        })?);
        writer.write_record(fields).map_err(csv_error)?;
    }
    writer.flush()?;
    debug!("wrote clean table: {} rows -> {}", rows.len(), path.display());
    Ok(())
}

/// Read the clean table back from disk.
pub fn read_clean(path: &Path) -> Result<Vec<CleanPost>, PipelineError> {
    let bytes = fs::read(path)?;
    let table = read_csv_bytes(&path.to_string_lossy(), &bytes)?;
    let mut rows = Vec::with_capacity(table.rows().len());
    for row in table.rows() {
        let tokens = table
            .field(row, "tokens")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        let hits = |column: &str| {
            table
                .field(row, column)
                .and_then(parse_count)
                .and_then(|count| u32::try_from(count).ok())
                .unwrap_or(0)
        };
        rows.push(CleanPost {
            post: post_from_row(&table, row),
            clean_title: table.field(row, "clean_title").unwrap_or_default().to_string(),
            clean_body: table.field(row, "clean_body").unwrap_or_default().to_string(),
            tokens,
            pos_hits: hits("pos_hits"),
            neg_hits: hits("neg_hits"),
            laugh_hits: hits("laugh_hits"),
        });
    }
    Ok(rows)
}

/// Write one keyed count table (`key,posts` or `key,count`).
pub fn write_count_table<K: ToString>(
    path: &Path,
    key_header: &str,
    value_header: &str,
    rows: &[(K, u64)],
) -> Result<(), PipelineError> {
    let mut writer = Writer::from_path(path).map_err(csv_error)?;
    writer
        .write_record([key_header, value_header])
        .map_err(csv_error)?;
    for (key, count) in rows {
        writer
            .write_record([key.to_string(), count.to_string()])
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

fn float_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v}"),
        _ => String::new(),
    }
}

/// Write the per-author rollup.
pub fn write_authors(path: &Path, rows: &[AuthorStats]) -> Result<(), PipelineError> {
    let mut writer = Writer::from_path(path).map_err(csv_error)?;
    writer
        .write_record([cols::COL_AUTHOR, "posts", "avg_rec", "avg_view"])
        .map_err(csv_error)?;
    for row in rows {
        writer
            .write_record([
                row.author.clone(),
                row.posts.to_string(),
                float_cell(row.avg_recommend),
                float_cell(row.avg_view),
            ])
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the top-post table (id, title, recommends, views, comments, datetime).
pub fn write_top_posts(path: &Path, rows: &[&CleanPost]) -> Result<(), PipelineError> {
    let mut writer = Writer::from_path(path).map_err(csv_error)?;
    writer
        .write_record([
            cols::COL_ID,
            cols::COL_TITLE,
            cols::COL_RECOMMENDS,
            cols::COL_VIEWS,
            cols::COL_COMMENTS,
            cols::COL_DATETIME,
        ])
        .map_err(csv_error)?;
    for row in rows {
        let post = &row.post;
        writer
            .write_record([
                opt_num(&post.id),
                opt(&post.title).to_string(),
                opt_num(&post.recommend_count),
                opt_num(&post.view_count),
                opt_num(&post.comment_count),
                post.posted_at
                    .map(|at| at.format(DATETIME_OUT_FORMAT).to_string())
                    .unwrap_or_default(),
            ])
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the correlation matrix with a leading label column.
pub fn write_correlation(path: &Path, matrix: &CorrelationMatrix) -> Result<(), PipelineError> {
    let mut writer = Writer::from_path(path).map_err(csv_error)?;
    let mut header = vec![""];
    header.extend(matrix.labels.iter().copied());
    writer.write_record(&header).map_err(csv_error)?;
    for (label, row) in matrix.labels.iter().zip(&matrix.values) {
        let mut record = vec![label.to_string()];
        record.extend(row.iter().map(|v| float_cell(Some(*v))));
        writer.write_record(&record).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

const TOKENIZED_SCHEMA: &str = "message clean_post {
    OPTIONAL INT64 id;
    OPTIONAL BYTE_ARRAY title (UTF8);
    OPTIONAL BYTE_ARRAY title_url (UTF8);
    OPTIONAL INT64 comment_count;
    OPTIONAL BYTE_ARRAY author (UTF8);
    OPTIONAL BYTE_ARRAY author_ip (UTF8);
    OPTIONAL INT64 view_count;
    OPTIONAL INT64 recommend_count;
    OPTIONAL BYTE_ARRAY posted_at_raw (UTF8);
    OPTIONAL BYTE_ARRAY posted_at (UTF8);
    OPTIONAL BYTE_ARRAY body (UTF8);
    OPTIONAL BYTE_ARRAY attachment_images (UTF8);
    REQUIRED BYTE_ARRAY source_shard (UTF8);
    REQUIRED BYTE_ARRAY clean_title (UTF8);
    REQUIRED BYTE_ARRAY clean_body (UTF8);
    REQUIRED BYTE_ARRAY tokens (UTF8);
    REQUIRED INT64 pos_hits;
    REQUIRED INT64 neg_hits;
    REQUIRED INT64 laugh_hits;
}";

fn parquet_error(err: parquet::errors::ParquetError) -> PipelineError {
    PipelineError::Artifact(format!("parquet write failed: {err}"))
}

fn write_opt_i64_column(
    row_group: &mut SerializedRowGroupWriter<'_, File>,
    values: &[Option<i64>],
) -> Result<(), PipelineError> {
    let mut column = row_group
        .next_column()
        .map_err(parquet_error)?
        .ok_or_else(|| PipelineError::Artifact("parquet schema exhausted early".into()))?;
    let def_levels: Vec<i16> = values.iter().map(|v| i16::from(v.is_some())).collect();
    let present: Vec<i64> = values.iter().filter_map(|v| *v).collect();
    column
        .typed::<Int64Type>()
        .write_batch(&present, Some(&def_levels), None)
        .map_err(parquet_error)?;
    column.close().map_err(parquet_error)
}

fn write_i64_column(
    row_group: &mut SerializedRowGroupWriter<'_, File>,
    values: &[i64],
) -> Result<(), PipelineError> {
    let mut column = row_group
        .next_column()
        .map_err(parquet_error)?
        .ok_or_else(|| PipelineError::Artifact("parquet schema exhausted early".into()))?;
    column
        .typed::<Int64Type>()
        .write_batch(values, None, None)
        .map_err(parquet_error)?;
    column.close().map_err(parquet_error)
}

fn write_opt_str_column(
    row_group: &mut SerializedRowGroupWriter<'_, File>,
    values: &[Option<String>],
) -> Result<(), PipelineError> {
    let mut column = row_group
        .next_column()
        .map_err(parquet_error)?
        .ok_or_else(|| PipelineError::Artifact("parquet schema exhausted early".into()))?;
    let def_levels: Vec<i16> = values.iter().map(|v| i16::from(v.is_some())).collect();
    let present: Vec<ByteArray> = values
        .iter()
        .flatten()
        .map(|v| ByteArray::from(v.as_str()))
        .collect();
    column
        .typed::<ByteArrayType>()
        .write_batch(&present, Some(&def_levels), None)
        .map_err(parquet_error)?;
    column.close().map_err(parquet_error)
}

fn write_str_column(
    row_group: &mut SerializedRowGroupWriter<'_, File>,
    values: &[String],
) -> Result<(), PipelineError> {
    let mut column = row_group
        .next_column()
        .map_err(parquet_error)?
        .ok_or_else(|| PipelineError::Artifact("parquet schema exhausted early".into()))?;
    let encoded: Vec<ByteArray> = values.iter().map(|v| ByteArray::from(v.as_str())).collect();
    column
        .typed::<ByteArrayType>()
        .write_batch(&encoded, None, None)
        .map_err(parquet_error)?;
    column.close().map_err(parquet_error)
}

/// Write the tokenized table as parquet, replacing any existing file.
pub fn write_tokenized_parquet(path: &Path, rows: &[CleanPost]) -> Result<(), PipelineError> {
    let schema = Arc::new(parse_message_type(TOKENIZED_SCHEMA).map_err(parquet_error)?);
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema, props).map_err(parquet_error)?;
    let mut row_group = writer.next_row_group().map_err(parquet_error)?;

    let posts: Vec<&Post> = rows.iter().map(|row| &row.post).collect();
    let opt_i64 = |pick: fn(&Post) -> Option<i64>| -> Vec<Option<i64>> {
        posts.iter().map(|post| pick(post)).collect()
    };
    let opt_str = |pick: fn(&Post) -> Option<String>| -> Vec<Option<String>> {
        posts.iter().map(|post| pick(post)).collect()
    };

    write_opt_i64_column(&mut row_group, &opt_i64(|p| p.id.map(|v| v as i64)))?;
    write_opt_str_column(&mut row_group, &opt_str(|p| p.title.clone()))?;
    write_opt_str_column(&mut row_group, &opt_str(|p| p.title_url.clone()))?;
    write_opt_i64_column(&mut row_group, &opt_i64(|p| p.comment_count))?;
    write_opt_str_column(&mut row_group, &opt_str(|p| p.author.clone()))?;
    write_opt_str_column(&mut row_group, &opt_str(|p| p.author_ip.clone()))?;
    write_opt_i64_column(&mut row_group, &opt_i64(|p| p.view_count))?;
    write_opt_i64_column(&mut row_group, &opt_i64(|p| p.recommend_count))?;
    write_opt_str_column(&mut row_group, &opt_str(|p| p.posted_at_raw.clone()))?;
    write_opt_str_column(
        &mut row_group,
        &opt_str(|p| {
            p.posted_at
                .map(|at| at.format(DATETIME_OUT_FORMAT).to_string())
        }),
    )?;
    write_opt_str_column(&mut row_group, &opt_str(|p| p.body.clone()))?;
    write_opt_str_column(&mut row_group, &opt_str(|p| p.attachment_images.clone()))?;
    write_str_column(
        &mut row_group,
        &posts
            .iter()
            .map(|p| p.source_shard.clone())
            .collect::<Vec<_>>(),
    )?;
    write_str_column(
        &mut row_group,
        &rows.iter().map(|r| r.clean_title.clone()).collect::<Vec<_>>(),
    )?;
    write_str_column(
        &mut row_group,
        &rows.iter().map(|r| r.clean_body.clone()).collect::<Vec<_>>(),
    )?;
    let tokens_json: Result<Vec<String>, PipelineError> = rows
        .iter()
        .map(|r| {
            serde_json::to_string(&r.tokens).map_err(|err| {
                PipelineError::Artifact(format!("token column encoding failed: {err}"))
            })
        })
        .collect();
    write_str_column(&mut row_group, &tokens_json?)?;
    write_i64_column(
        &mut row_group,
        &rows.iter().map(|r| i64::from(r.pos_hits)).collect::<Vec<_>>(),
    )?;
    write_i64_column(
        &mut row_group,
        &rows.iter().map(|r| i64::from(r.neg_hits)).collect::<Vec<_>>(),
    )?;
    write_i64_column(
        &mut row_group,
        &rows.iter().map(|r| i64::from(r.laugh_hits)).collect::<Vec<_>>(),
    )?;

    row_group.close().map_err(parquet_error)?;
    writer.close().map_err(parquet_error)?;
    debug!("wrote tokenized table: {} rows -> {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::stats::ENGAGEMENT_COLUMNS;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sample_posts() -> Vec<Post> {
        vec![
            Post {
                id: Some(1),
                title: Some("첫 글, 쉼표 포함".to_string()),
                comment_count: Some(3),
                author: Some("ㅇㅇ".to_string()),
                view_count: Some(120),
                recommend_count: Some(7),
                posted_at_raw: Some("2024.03.01 08:15:00".to_string()),
                posted_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_opt(8, 15, 0),
                body: Some("본문 https://example.com ㅋㅋㅋ".to_string()),
                source_shard: "post-dataset/a.csv".to_string(),
                ..Post::default()
            },
            Post {
                id: None,
                source_shard: "post-dataset/b.csv".to_string(),
                ..Post::default()
            },
        ]
    }

    #[test]
    fn canonical_table_survives_disk_round_trip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("main.csv");
        let posts = sample_posts();
        write_canonical(&path, &posts).unwrap();

        let loaded = read_canonical(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, Some(1));
        assert_eq!(loaded[0].title.as_deref(), Some("첫 글, 쉼표 포함"));
        assert_eq!(loaded[0].view_count, Some(120));
        assert_eq!(loaded[0].posted_at, posts[0].posted_at);
        assert_eq!(loaded[1].id, None);
        assert_eq!(loaded[1].source_shard, "post-dataset/b.csv");
    }

    #[test]
    fn canonical_header_is_column_complete() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("main.csv");
        write_canonical(&path, &[]).unwrap();
        let header_line = fs::read_to_string(&path).unwrap();
        for column in CANONICAL_HEADERS {
            assert!(header_line.contains(column), "missing column {column}");
        }
    }

    #[test]
    fn clean_table_preserves_token_order() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("main_clean.csv");
        let rows = vec![CleanPost {
            post: sample_posts().remove(0),
            clean_title: "첫 글 쉼표 포함".to_string(),
            clean_body: "본문 ㅋㅋ".to_string(),
            tokens: vec!["본문".to_string(), "내용".to_string(), "본문".to_string()],
            pos_hits: 1,
            neg_hits: 0,
            laugh_hits: 1,
        }];
        write_clean(&path, &rows).unwrap();
        let loaded = read_clean(&path).unwrap();
        assert_eq!(loaded[0].tokens, rows[0].tokens);
        assert_eq!(loaded[0].pos_hits, 1);
        assert_eq!(loaded[0].clean_body, "본문 ㅋㅋ");
    }

    #[test]
    fn corrupt_hit_counts_read_back_as_zero() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("main_clean.csv");
        fs::write(&path, "번호,pos_hits,neg_hits,tokens\n1,-3,2,[]\n").unwrap();

        let rows = read_clean(&path).unwrap();
        assert_eq!(rows[0].pos_hits, 0);
        assert_eq!(rows[0].neg_hits, 2);
    }

    #[test]
    fn tokenized_parquet_writes_without_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("main_clean_okt.parquet");
        let rows = vec![CleanPost {
            post: sample_posts().remove(0),
            clean_title: String::new(),
            clean_body: "본문".to_string(),
            tokens: vec!["본문".to_string()],
            pos_hits: 0,
            neg_hits: 0,
            laugh_hits: 0,
        }];
        write_tokenized_parquet(&path, &rows).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn correlation_table_blanks_undefined_cells() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("engagement_corr.csv");
        let matrix = CorrelationMatrix {
            labels: ENGAGEMENT_COLUMNS.to_vec(),
            values: vec![vec![f64::NAN; 6]; 6],
        };
        write_correlation(&path, &matrix).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().contains("조회"));
        assert_eq!(lines.next().unwrap(), "조회,,,,,,");
    }
}
