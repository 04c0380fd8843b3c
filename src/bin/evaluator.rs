use std::fs::File;
use std::io::BufWriter;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{anyhow, Context};
use indicatif::ProgressBar;
use log::{info, LevelFilter};
use rayon::prelude::*;
use simple_logger::SimpleLogger;

use tagentropy::config::AppConfig;
use tagentropy::io;
use tagentropy::metrics::evaluation_reporter::EvaluationReporter;
use tagentropy::metrics::tag_entropy::TagEntropyMetric;
use tagentropy::metrics::{EvaluationRun, TestUser, UserMetric, UserMetricAccumulator};
use tagentropy::sources::{InMemoryItemTags, PrecomputedRecommendations};
use tagentropy::stopwatch::Stopwatch;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_default();
    let config = AppConfig::new(&config_path)?;

    let level = LevelFilter::from_str(&config.log.level)
        .map_err(|_| anyhow!("unknown log level '{}'", config.log.level))?;
    SimpleLogger::new().with_level(level).init()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.run.num_threads)
        .build_global()?;

    let vocabulary = io::read_vocabulary(&config.data.vocabulary_path)?;
    let item_tags = InMemoryItemTags::from_file(&config.data.item_tags_path)?;
    let recommender = PrecomputedRecommendations::from_files(
        &config.data.recommendations_path,
        config.data.training_data_path.as_deref(),
    )?;

    let run = EvaluationRun::new(&config.run.algorithm, &config.run.dataset);
    let metric = TagEntropyMetric::new(config.metric.list_size);
    let mut accumulator = metric.make_accumulator(&run);
    let mut reporter = EvaluationReporter::new(&metric, &run);
    let mut stopwatch = Stopwatch::new();

    let users = recommender.users();
    info!("Evaluating {} users with {} threads", users.len(), config.run.num_threads);
    let pb = ProgressBar::new(users.len() as u64);

    // The per-user computation is pure, so it runs in parallel. Accumulation happens
    // below on this thread, in user order.
    let user_entropies = users
        .par_iter()
        .map(|user_id| {
            let test_user = TestUser {
                user_id: *user_id,
                recommender: &recommender,
                item_tags: &item_tags,
                vocabulary: &vocabulary,
            };
            let start_time = Instant::now();
            let entropy = metric.evaluate_user(&test_user);
            pb.inc(1);
            entropy.map(|entropy| (*user_id, entropy, start_time.elapsed()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    pb.finish();

    for (user_id, entropy, duration) in user_entropies {
        stopwatch.record(user_id, duration);
        reporter.add(user_id, accumulator.accumulate(entropy));
    }

    if let Some(per_user_path) = &config.output.per_user_path {
        let file = File::create(per_user_path)
            .with_context(|| format!("cannot create {}", per_user_path))?;
        reporter.write_user_rows(BufWriter::new(file))?;
        info!("Wrote per-user results to {}", per_user_path);
    }

    let final_results = accumulator
        .final_results()
        .context("no user had recommendations to evaluate")?;

    info!(
        "Evaluated {} users, {} with recommendations",
        reporter.qty_users(),
        reporter.qty_users_with_value()
    );
    info!(
        "Evaluation latency p90={:.1} p95={:.1} p99.5={:.1} (microseconds)",
        stopwatch.get_percentile_in_micros(0.90),
        stopwatch.get_percentile_in_micros(0.95),
        stopwatch.get_percentile_in_micros(0.995)
    );
    println!("{}", reporter.get_name());
    println!("{}", reporter.result(&final_results));
    Ok(())
}
