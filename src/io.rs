use anyhow::{anyhow, Context};
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use log::info;
use rayon::prelude::*;
use serde_derive::Deserialize;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use std::str::FromStr;

use crate::sources::ScoredItem;
use crate::vocabulary::TagVocabulary;

pub type UserId = u64;
pub type ItemId = u64;
pub type Score = f64;

#[derive(Debug, Deserialize)]
struct ItemTagRecord {
    item_id: ItemId,
    tag: String,
}

/// One tag per line, no header. Blank lines are skipped.
pub fn read_vocabulary(vocabulary_path: &str) -> anyhow::Result<TagVocabulary> {
    let tags = create_buffered_line_reader(vocabulary_path)
        .with_context(|| format!("cannot open vocabulary file {}", vocabulary_path))?
        .map(|line| line.map(|tag| tag.trim().to_string()))
        .collect::<io::Result<Vec<String>>>()
        .with_context(|| format!("cannot read vocabulary file {}", vocabulary_path))?;
    let vocabulary = TagVocabulary::new(tags);
    info!("Loaded {} tags from {}", vocabulary.len(), vocabulary_path);
    Ok(vocabulary)
}

/// `item_id,tag` csv with a header row. Tags keep the order of the file and are
/// trimmed like vocabulary lines.
pub fn read_item_tags(item_tags_path: &str) -> anyhow::Result<HashMap<ItemId, Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(item_tags_path)
        .with_context(|| format!("cannot open item tags file {}", item_tags_path))?;
    let records = reader
        .deserialize::<ItemTagRecord>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("malformed item tags file {}", item_tags_path))?;
    let qty_records = records.len();
    let item_tags: HashMap<ItemId, Vec<String>> = records
        .into_iter()
        .map(|record| (record.item_id, record.tag))
        .into_group_map()
        .into_iter()
        .collect();
    info!(
        "Loaded {} item tags for {} items from {}",
        qty_records,
        item_tags.len(),
        item_tags_path
    );
    Ok(item_tags)
}

/// Whitespace separated `user_id item_id score` with a header row. The rows of a
/// user are its recommendation list in rank order.
pub fn read_recommendations(
    recommendations_path: &str,
) -> anyhow::Result<HashMap<UserId, Vec<ScoredItem>>> {
    let rows: Vec<(UserId, ScoredItem)> = read_data_rows(recommendations_path)?
        .map(|(line_number, parts)| {
            let user_id = parse_column::<UserId>(&parts, 0, line_number, recommendations_path)?;
            let item_id = parse_column::<ItemId>(&parts, 1, line_number, recommendations_path)?;
            let score = parse_column::<Score>(&parts, 2, line_number, recommendations_path)?;
            Ok((user_id, ScoredItem::new(item_id, score)))
        })
        .collect::<anyhow::Result<_>>()?;
    let qty_rows = rows.len();
    let recommendations: HashMap<UserId, Vec<ScoredItem>> = rows
        .into_iter()
        .into_group_map()
        .into_iter()
        .collect();
    info!(
        "Loaded {} recommendations for {} users from {}",
        qty_rows,
        recommendations.len(),
        recommendations_path
    );
    Ok(recommendations)
}

/// Whitespace separated `user_id item_id` with a header row. Extra columns are ignored.
pub fn read_training_data(
    training_data_path: &str,
) -> anyhow::Result<HashMap<UserId, HashSet<ItemId>>> {
    let rows: Vec<(UserId, ItemId)> = read_data_rows(training_data_path)?
        .map(|(line_number, parts)| {
            let user_id = parse_column::<UserId>(&parts, 0, line_number, training_data_path)?;
            let item_id = parse_column::<ItemId>(&parts, 1, line_number, training_data_path)?;
            Ok((user_id, item_id))
        })
        .collect::<anyhow::Result<_>>()?;
    let mut training_items: HashMap<UserId, HashSet<ItemId>> = HashMap::new();
    for (user_id, item_id) in rows {
        training_items.entry(user_id).or_default().insert(item_id);
    }
    info!(
        "Loaded training items of {} users from {}",
        training_items.len(),
        training_data_path
    );
    Ok(training_items)
}

/// Splits non-empty data lines in parallel, yielding the 1-based line number and the
/// whitespace separated columns. The header line is skipped and file order is kept
/// when the rows are collected.
fn read_data_rows(
    path: &str,
) -> anyhow::Result<impl ParallelIterator<Item = (usize, Vec<String>)>> {
    let line_iterator =
        create_buffered_line_reader(path).with_context(|| format!("cannot open {}", path))?;
    let lines = line_iterator
        .enumerate()
        .skip(1) // skip header
        .map(|(index, line)| line.map(|rawline| (index + 1, rawline)))
        .collect::<io::Result<Vec<_>>>()
        .with_context(|| format!("cannot read {}", path))?;
    Ok(lines.into_par_iter().filter_map(|(line_number, rawline)| {
        let parts = rawline
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>();
        if parts.is_empty() {
            None
        } else {
            Some((line_number, parts))
        }
    }))
}

fn parse_column<T>(
    parts: &[String],
    column: usize,
    line_number: usize,
    path: &str,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = parts
        .get(column)
        .ok_or_else(|| anyhow!("{}:{}: missing column {}", path, line_number, column + 1))?;
    raw.parse::<T>()
        .with_context(|| format!("{}:{}: cannot parse '{}'", path, line_number, raw))
}

fn create_buffered_line_reader<P>(filename: P) -> io::Result<io::Lines<io::BufReader<File>>>
where
    P: AsRef<Path>,
{
    let file = File::open(filename)?;
    Ok(io::BufReader::new(file).lines())
}
