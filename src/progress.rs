//! Parsing of the extractor's progress-hook lines.

/// Marker the progress template puts in front of every hook line.
pub const HOOK_PREFIX: &str = "HOOK|";

/// `--progress-template` argument: one `HOOK|status|downloaded|total|estimate` line per hook call.
pub const PROGRESS_TEMPLATE: &str = "download:HOOK|%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s";

/// Sub-phase reported by a hook call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStatus {
    Downloading,
    /// Download done, post-processing not yet started
    Finished,
    Other,
}

/// One progress-hook invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressHook {
    pub status: HookStatus,
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub total_bytes_estimate: Option<f64>,
}

impl ProgressHook {
    /// A `downloading` hook with the given counters
    pub fn downloading(downloaded: u64, total: Option<u64>, estimate: Option<f64>) -> Self {
        Self {
            status: HookStatus::Downloading,
            downloaded_bytes: Some(downloaded),
            total_bytes: total,
            total_bytes_estimate: estimate,
        }
    }

    /// A `finished` hook
    pub fn finished() -> Self {
        Self {
            status: HookStatus::Finished,
            downloaded_bytes: None,
            total_bytes: None,
            total_bytes_estimate: None,
        }
    }

    /// `downloaded / total`, using the estimate when the exact total is unknown.
    ///
    /// `None` when neither total is known or both are zero.
    pub fn fraction(&self) -> Option<f32> {
        let total = self
            .total_bytes
            .filter(|t| *t > 0)
            .map(|t| t as f64)
            .or_else(|| self.total_bytes_estimate.filter(|t| *t > 0.0))?;
        let downloaded = self.downloaded_bytes.unwrap_or(0) as f64;
        Some((downloaded / total).clamp(0.0, 1.0) as f32)
    }
}

/// Parse one stdout line; lines that are not hook lines give `None`.
pub fn parse_hook_line(line: &str) -> Option<ProgressHook> {
    let rest = line.trim().strip_prefix(HOOK_PREFIX)?;
    let mut fields = rest.split('|').map(str::trim);

    let status = match fields.next()? {
        "downloading" => HookStatus::Downloading,
        "finished" => HookStatus::Finished,
        _ => HookStatus::Other,
    };
    let downloaded_bytes = fields.next().and_then(parse_count);
    let total_bytes = fields.next().and_then(parse_count);
    let total_bytes_estimate = fields.next().and_then(|f| f.parse::<f64>().ok());

    Some(ProgressHook {
        status,
        downloaded_bytes,
        total_bytes,
        total_bytes_estimate,
    })
}

// Missing values come through as "NA"; some counters are printed as floats.
fn parse_count(field: &str) -> Option<u64> {
    field
        .parse::<u64>()
        .ok()
        .or_else(|| field.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
}
