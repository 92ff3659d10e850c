//! Plain-text result cards

use std::fmt;

use super::Report;
use crate::presets::Band;
use crate::resolve::ResolvedFeed;

fn row(f: &mut fmt::Formatter<'_>, label: &str, value: impl fmt::Display) -> fmt::Result {
    writeln!(f, "  {:<16}{}", label, value)
}

fn band(b: Band, decimals: usize) -> String {
    format!("{:.p$}-{:.p$}", b.min, b.max, p = decimals)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let u = self.units;
        let mut title = format!("{} ({})", capitalize(&self.operation.to_string()), u);
        if let Some(machine) = &self.machine {
            title.push_str(&format!(" on {} [{}]", machine, self.drive));
        }
        writeln!(f, "{}", title)?;

        row(f, "RPM", format!("{:.0}", self.params.rpm))?;
        row(f, u.speed_label(), format!("{:.1}", self.params.cutting_speed))?;
        match self.params.feed {
            ResolvedFeed::PerRev {
                feed_per_rev,
                feed_per_min,
            } => {
                row(f, u.feed_per_rev_label(), format!("{:.4}", feed_per_rev))?;
                row(f, u.feed_per_min_label(), format!("{:.3}", feed_per_min))?;
            }
            ResolvedFeed::PerTooth {
                chip_load,
                flutes,
                feed_per_min,
            } => {
                row(f, "Flutes", flutes)?;
                row(f, &format!("Chipload ({})", u.chip_load_label()), format!("{:.4}", chip_load))?;
                row(f, &format!("Feed ({})", u.feed_per_min_label()), format!("{:.2}", feed_per_min))?;
            }
        }

        if let Some(power) = &self.power {
            row(f, &format!("Est {}", u.power_label()), format!("{:.2}", power.required))?;
            row(
                f,
                &format!("Allowed {}", u.power_label()),
                format!("{:.2} ({}% of {:.1})", power.allowed, power.max_load_pct, power.available),
            )?;
        }

        let mut recommended = Vec::new();
        if let Some(b) = self.recommended.cutting_speed {
            recommended.push(format!("{} {}", u.speed_label(), band(b, 0)));
        }
        if let Some(b) = self.recommended.feed_per_rev {
            recommended.push(format!("{} {}", u.feed_per_rev_label(), band(b, 4)));
        }
        if let Some(b) = self.recommended.chip_load {
            recommended.push(format!("{} {}", u.chip_load_label(), band(b, 4)));
        }
        if !recommended.is_empty() {
            row(f, "Recommended", recommended.join(", "))?;
        }

        for advisory in &self.advisories {
            writeln!(f, "  {:<8}{}", advisory.severity.to_string(), advisory.message)?;
        }
        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
