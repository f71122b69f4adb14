//! Samples command implementation.

use ccreplay_core::samples::TPL_SAMPLES;

/// Prints the built-in sample schedules.
pub fn run() {
    println!("Two-phase locking samples (use with `tpl --sample <n>`):");
    for (index, sample) in TPL_SAMPLES.iter().enumerate() {
        println!("  {}: {}", index + 1, sample.trim());
    }
    println!();
    println!("Optimistic concurrency control sample (use with `occ --sample`):");
    println!("  T1, T2: R(B); W(B); R(A); W(A)");
    println!("  schedule: 1 1 2 2 2 2 1 1");
}
