// Training datasets — CSV loading and synthetic sample generation.
//
// Two CSV shapes are accepted:
//   long: text,category,label      (one category per row)
//   wide: text plus one 0/1 column per known category
//
// A missing file or missing required columns aborts the whole load; an
// unknown category label only skips its rows with a warning.

use std::path::Path;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::classifier::Category;

/// One labeled training example.
#[derive(Debug, Clone)]
pub struct LabeledRow {
    pub text: String,
    pub category: Category,
    pub label: u8,
}

/// Load labeled rows from a CSV file, detecting the shape from the header.
pub fn load_csv(path: &Path) -> Result<Vec<LabeledRow>> {
    if !path.exists() {
        bail!("Training data file not found: {}", path.display());
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open training data at {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let Some(text_col) = column("text") else {
        bail!("Missing required columns in training data: text");
    };

    let mut rows = Vec::new();

    if let (Some(category_col), Some(label_col)) = (column("category"), column("label")) {
        // Long shape: one (category, label) pair per row.
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let line = i + 2; // header is line 1
            let label = parse_label(record.get(label_col).unwrap_or(""))
                .with_context(|| format!("line {line}: malformed label"))?;
            let raw_category = record.get(category_col).unwrap_or("");
            match Category::parse(raw_category) {
                Ok(category) => rows.push(LabeledRow {
                    text: record.get(text_col).unwrap_or("").to_string(),
                    category,
                    label,
                }),
                Err(_) => {
                    warn!(category = raw_category, line, "Skipping unknown category");
                }
            }
        }
    } else {
        // Wide shape: one binary column per known category.
        let category_cols: Vec<(Category, usize)> = Category::ALL
            .iter()
            .filter_map(|&c| column(c.as_str()).map(|i| (c, i)))
            .collect();
        if category_cols.is_empty() {
            bail!(
                "Missing required columns in training data: \
                 either category+label or one column per category"
            );
        }

        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let line = i + 2;
            let text = record.get(text_col).unwrap_or("").to_string();
            for &(category, col) in &category_cols {
                let label = parse_label(record.get(col).unwrap_or(""))
                    .with_context(|| format!("line {line}: malformed {category} label"))?;
                rows.push(LabeledRow {
                    text: text.clone(),
                    category,
                    label,
                });
            }
        }
    }

    info!(rows = rows.len(), path = %path.display(), "Loaded training data");
    Ok(rows)
}

fn parse_label(raw: &str) -> Result<u8> {
    match raw.trim() {
        "0" => Ok(0),
        "1" => Ok(1),
        other => bail!("expected binary label 0 or 1, got {other:?}"),
    }
}

/// Curated example pool per category: (text, label). Labels mark whether the
/// example violates that category's policy.
const SAMPLE_POOLS: &[(Category, &[(&str, u8)])] = &[
    (
        Category::Profanity,
        &[
            ("What a calm and pleasant afternoon this turned out to be.", 0),
            ("You absolute idiot, how could you ship that?", 1),
            ("The delivery arrived a day early, great service.", 0),
            ("This damn printer never works when I need it.", 1),
            ("Thanks for walking me through the setup steps.", 0),
            ("Only a stupid person would believe that crap.", 1),
            ("The park was quiet and the weather held up.", 0),
            ("What the hell were they thinking with this redesign?", 1),
        ],
    ),
    (
        Category::HateSpeech,
        &[
            ("Everyone deserves the same respect regardless of background.", 0),
            ("People like that are inferior and shouldn't be allowed here.", 1),
            ("Our neighborhood potluck brought all kinds of families together.", 0),
            ("I can't stand those people, they are disgusting.", 1),
            ("Different perspectives make the discussion richer.", 0),
            ("They don't belong in this country and never will.", 1),
            ("The new hire brings a lot of experience to the team.", 0),
            ("Keep those kind of people away from our school.", 1),
        ],
    ),
    (
        Category::Violence,
        &[
            ("Let's talk it over calmly before deciding anything.", 0),
            ("I will kill you if you say that again.", 1),
            ("The match was intense but stayed fair throughout.", 0),
            ("Someone should break his legs for what he did.", 1),
            ("She handled the dispute with real patience.", 0),
            ("I'm going to hurt you and everyone you know.", 1),
            ("The hiking trail closes at sunset this season.", 0),
            ("Wait until I catch him, I'll beat him senseless.", 1),
        ],
    ),
    (
        Category::SexualContent,
        &[
            ("The museum opened a new exhibit on maritime history.", 0),
            ("Send me photos of you naked tonight.", 1),
            ("The cafe on the corner finally reopened.", 0),
            ("You looked so hot, I can't stop thinking about your body.", 1),
            ("We repainted the kitchen over the weekend.", 0),
            ("Want to see something nude? Check your messages.", 1),
            ("The documentary covered coastal erosion in detail.", 0),
            ("That swimsuit picture was so sexy, post more.", 1),
        ],
    ),
    (
        Category::Harassment,
        &[
            ("Let me know if you'd like help with the move.", 0),
            ("I know where you live and I will find you.", 1),
            ("No rush on the reply, whenever suits you.", 0),
            ("Answer me right now, you can't ignore me forever.", 1),
            ("Congratulations on the new role, well deserved.", 0),
            ("I'm watching everything you post, every single day.", 1),
            ("Happy to reschedule if the time doesn't work.", 0),
            ("I'll keep messaging you until you give in.", 1),
        ],
    ),
];

/// Write a synthetic long-format training CSV: `count` rows drawn from the
/// per-category pools, with `mislabel_fraction` of rows intentionally
/// flipped to simulate noisy ground truth. Seeded, so the same arguments
/// reproduce the same file.
pub fn generate_sample(
    path: &Path,
    count: usize,
    mislabel_fraction: f64,
    seed: u64,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create sample data at {}", path.display()))?;
    writer.write_record(["text", "category", "label"])?;

    let noise = mislabel_fraction.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..count {
        let (category, pool) = SAMPLE_POOLS[rng.random_range(0..SAMPLE_POOLS.len())];
        let (text, true_label) = pool[rng.random_range(0..pool.len())];
        let label = if rng.random_bool(noise) {
            1 - true_label
        } else {
            true_label
        };
        writer.write_record([text, category.as_str(), if label == 1 { "1" } else { "0" }])?;
    }

    writer.flush()?;
    info!(path = %path.display(), count, "Wrote sample training data");
    Ok(())
}
