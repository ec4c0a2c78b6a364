/// Console rendering for listings and operation outcomes

use colored::Colorize;

use crate::core::docker::{DockerImageInfo, DockerVolumeInfo};
use crate::core::outcome::{BatchSummary, OperationOutcome, OperationStatus};
use crate::core::restore::BackupFileInfo;
use crate::utils::{format_bytes, format_elapsed, truncate_string};

pub fn print_volume_table(volumes: &[DockerVolumeInfo]) {
    if volumes.is_empty() {
        println!("{}", "No Docker volumes found".yellow());
        return;
    }

    println!("{:<40} {:<10} {:<60}", "Volume", "Driver", "Mountpoint");
    println!("{}", "-".repeat(110));
    for volume in volumes {
        println!(
            "{:<40} {:<10} {:<60}",
            truncate_string(&volume.name, 40),
            volume.driver,
            volume.mountpoint
        );
    }
    println!("\n{} volume(s)", volumes.len());
}

pub fn print_image_table(images: &[DockerImageInfo]) {
    if images.is_empty() {
        println!("{}", "No Docker images found".yellow());
        return;
    }

    println!("{:<14} {:<50} {:>12} {:<20}", "Image ID", "Tags", "Size", "Created");
    println!("{}", "-".repeat(99));
    for image in images {
        let tags = if image.repo_tags.is_empty() {
            "<none>".to_string()
        } else {
            image.repo_tags.join(", ")
        };
        let created = image
            .created_at
            .map(|c| c.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "{:<14} {:<50} {:>12} {:<20}",
            truncate_string(image.id.trim_start_matches("sha256:"), 12),
            truncate_string(&tags, 50),
            format_bytes(image.size_bytes),
            created
        );
    }
    println!("\n{} image(s)", images.len());
}

pub fn print_backup_table(backups: &[BackupFileInfo]) {
    if backups.is_empty() {
        println!("{}", "No backup archives found".yellow());
        return;
    }

    println!("{:<50} {:>12} {:<20}", "Archive", "Size", "Modified");
    println!("{}", "-".repeat(84));
    for backup in backups {
        let modified = backup
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "{:<50} {:>12} {:<20}",
            truncate_string(&backup.file_name, 50),
            format_bytes(backup.size_bytes),
            modified
        );
    }
    println!("\n{} archive(s)", backups.len());
}

fn status_icon(status: OperationStatus) -> colored::ColoredString {
    match status {
        OperationStatus::Success => "✓".green(),
        OperationStatus::Failed => "✗".red(),
        OperationStatus::Skipped => "○".yellow(),
    }
}

/// One line per outcome, e.g. `✓ app-data  [2.1s, 1.46 KB]  /b/app-data.tar.gz`
pub fn print_outcome(outcome: &OperationOutcome) {
    let mut details = vec![format_elapsed(outcome.duration())];
    if let Some(size) = outcome.size_bytes() {
        details.push(format_bytes(size));
    }

    let mut line = format!(
        "{} {:<30} [{}]",
        status_icon(outcome.status()),
        outcome.resource_name().bold(),
        details.join(", ")
    );
    if let (OperationStatus::Success, Some(path)) = (outcome.status(), outcome.archive_path()) {
        line.push_str(&format!("  {}", path.display()));
    }
    println!("{}", line);

    if let Some(message) = outcome.message() {
        let message = match outcome.status() {
            OperationStatus::Failed => message.red(),
            OperationStatus::Skipped => message.yellow(),
            OperationStatus::Success => message.dimmed(),
        };
        println!("    {}", message);
    }
}

pub fn print_outcomes(outcomes: &[OperationOutcome]) {
    for outcome in outcomes {
        print_outcome(outcome);
    }
    print_summary(&BatchSummary::from_outcomes(outcomes));
}

pub fn print_summary(summary: &BatchSummary) {
    println!();
    println!(
        "{} succeeded, {} skipped, {} failed",
        summary.succeeded.to_string().green(),
        summary.skipped.to_string().yellow(),
        if summary.failed > 0 {
            summary.failed.to_string().red()
        } else {
            summary.failed.to_string().normal()
        }
    );
}
