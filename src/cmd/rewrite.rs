use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::context::AppContext;
use crate::error::AppResult;
use crate::workflow::rewrite::{RewriteOptions, RewriteOutcome, RewriteProgress, rewrite_history};

#[derive(Debug, Clone)]
pub struct RewriteCommandArgs {
    pub branch: Option<String>,
    pub dry_run: bool,
    pub seed: Option<u64>,
}

pub async fn run(ctx: &AppContext, args: RewriteCommandArgs) -> AppResult<RewriteOutcome> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let window = ctx.config.date_window;
    if args.dry_run {
        println!("Dry run: previewing new history, the repository will not be modified.");
    } else {
        println!("Rewriting commit history without modifying file contents...");
    }
    println!(
        "Dates are drawn between {} and {}.",
        window.start(),
        window.end()
    );

    let options = RewriteOptions {
        branch: args.branch,
        dry_run: args.dry_run,
    };
    rewrite_history(ctx, options, &mut rng, print_progress).await
}

fn print_progress(progress: &RewriteProgress<'_>) {
    println!("{}", progress_line(progress));
}

fn progress_line(progress: &RewriteProgress<'_>) -> String {
    format!(
        "Rewriting commit {}/{}: {} on {}",
        progress.index, progress.total, progress.rewrite.message, progress.rewrite.timestamp
    )
}
