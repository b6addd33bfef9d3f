use console::Style;
use hydrosat_core::alerts::{AlertReport, Severity};
use hydrosat_core::change::ChangeReport;
use hydrosat_core::classify::ParcelClass;
use hydrosat_core::monitor::DashboardSummary;
use hydrosat_core::report::{ClassificationResult, SkippedWatershed, WatershedReport};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    high: Style,
    medium: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            high: Style::new().red().bold(),
            medium: Style::new().yellow(),
        }
    }

    fn severity(&self, severity: Severity) -> &Style {
        match severity {
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.label,
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

pub fn print_classification(result: &ClassificationResult) {
    let s = Styles::new();
    print_title(&s, "Parcel Classification");

    println!("  {:<14}{}", s.label.apply_to("Region"), s.value.apply_to(&result.region));
    println!("  {:<14}{}", s.label.apply_to("Period"), s.value.apply_to(result.period));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Composite"),
        s.method.apply_to(format!(
            "{} of {} scene(s), {}",
            result.parameters.method, result.images_processed, result.parameters.product
        ))
    );
    let dates: Vec<String> = result.acquisition_dates.iter().map(|d| d.to_string()).collect();
    println!("  {:<14}{}", s.label.apply_to("Dates"), s.value.apply_to(dates.join(", ")));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Area"),
        s.value.apply_to(format!("{:.2} ha", result.areas.area_total_ha))
    );
    if result.areas.approximate {
        println!("  {:<14}{}", s.label.apply_to("Note"), s.disabled.apply_to("sampled, approximate"));
    }
    println!();

    println!("  {}", s.header.apply_to("Classes"));
    for class in ParcelClass::ALL {
        println!(
            "    {:<20}{:>12}{:>9}",
            s.label.apply_to(class.label()),
            format!("{:.2} ha", result.hectares(class)),
            format!("{:.1}%", result.percent(class))
        );
    }
    println!();

    println!(
        "  {:<14}{}",
        s.header.apply_to("Problematic"),
        s.value.apply_to(format!(
            "{:.2} ha ({:.1}%)",
            result.areas.summary.problematic_ha,
            result.problematic_pct()
        ))
    );
    if let Some(ref fc) = result.areas.geojson {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Vectors"),
            s.value.apply_to(format!("{} feature(s)", fc.features.len()))
        );
    } else if let Some(ref omitted) = result.areas.vector_omitted {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Vectors"),
            s.disabled.apply_to(format!(
                "omitted, {} features over the cap of {}",
                omitted.feature_count, omitted.cap
            ))
        );
    }
    println!();
}

pub fn print_watersheds(report: &WatershedReport) {
    let s = Styles::new();
    print_title(&s, "Watershed Ranking");

    println!("  {:<14}{}", s.label.apply_to("Period"), s.value.apply_to(report.period));
    println!();
    for (rank, entry) in report.ranking.iter().enumerate() {
        println!(
            "    {}. {:<12}{:>8}{:>14}",
            s.label.apply_to(rank + 1),
            s.value.apply_to(entry.watershed.display_name()),
            format!("{:.1}%", entry.problematic_pct),
            format!("{:.2} ha", entry.waterlogged_ha)
        );
    }
    print_skipped(&s, &report.skipped);
    println!();
}

pub fn print_changes(report: &ChangeReport) {
    let s = Styles::new();
    print_title(&s, "Change Detection");

    println!("  {:<14}{}", s.label.apply_to("Region"), s.value.apply_to(&report.region));
    println!("  {:<14}{}", s.label.apply_to("Before"), s.value.apply_to(report.period1));
    println!("  {:<14}{}", s.label.apply_to("After"), s.value.apply_to(report.period2));
    println!();

    println!("  {}", s.header.apply_to("Classes"));
    for (class, delta) in &report.classes {
        println!(
            "    {:<20}{:>8}{:>8}{:>9}",
            s.label.apply_to(class.label()),
            format!("{:.1}%", delta.before_pct),
            format!("{:.1}%", delta.after_pct),
            format!("{:+.1}", delta.delta_pct)
        );
    }
    println!();

    let trend_style = if report.trend.code.is_worsening() {
        &s.high
    } else {
        &s.method
    };
    println!(
        "  {:<14}{}",
        s.header.apply_to("Trend"),
        trend_style.apply_to(format!(
            "{} ({:+.1} points)",
            report.trend.description, report.trend.total_delta_pct
        ))
    );
    println!();
}

pub fn print_alerts(report: &AlertReport) {
    let s = Styles::new();
    print_title(&s, "Alerts");

    println!("  {:<14}{}", s.label.apply_to("Period"), s.value.apply_to(report.period));
    if let Some(reference) = report.reference_period {
        println!("  {:<14}{}", s.label.apply_to("Reference"), s.value.apply_to(reference));
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Total"),
        s.value.apply_to(format!(
            "{} ({} high, {} medium)",
            report.total, report.high, report.medium
        ))
    );
    println!();

    if report.alerts.is_empty() {
        println!("  {}", s.disabled.apply_to("No alerts"));
    }
    for alert in &report.alerts {
        println!(
            "  {:<8}{}",
            s.severity(alert.severity).apply_to(alert.severity),
            alert.message
        );
        println!("  {:<8}{}", "", s.label.apply_to(&alert.suggested_action));
    }
    println!();
}

pub fn print_dashboard(summary: &DashboardSummary, from_cache: bool) {
    let s = Styles::new();
    print_title(&s, "Monitoring Dashboard");

    let state = &summary.general_state;
    println!(
        "  {:<14}{}",
        s.label.apply_to("Window"),
        s.value.apply_to(format!(
            "{} to {} ({} days)",
            summary.period.start, summary.period.end, summary.period.days
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Area"),
        s.value.apply_to(format!("{:.2} ha", state.area_total_ha))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Productive"),
        s.value.apply_to(format!("{:.2} ha", state.productive_ha))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Problematic"),
        s.value.apply_to(format!(
            "{:.2} ha ({:.1}%)",
            state.problematic_ha, state.problematic_pct
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Images"),
        s.value.apply_to(state.images_processed)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Generated"),
        s.value.apply_to(summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))
    );
    if from_cache {
        println!("  {:<14}{}", s.label.apply_to("Source"), s.disabled.apply_to("cache"));
    }
    println!();

    println!("  {}", s.header.apply_to("Ranking"));
    for entry in &summary.watershed_ranking {
        println!(
            "    {:<12}{:>8}",
            s.value.apply_to(entry.watershed.display_name()),
            format!("{:.1}%", entry.problematic_pct)
        );
    }
    print_skipped(&s, &summary.skipped);
    println!();

    println!(
        "  {} {}",
        s.header.apply_to("Alerts"),
        s.label.apply_to(format!(
            "(top {} of {})",
            summary.top_alerts.len(),
            summary.total_alert_count
        ))
    );
    for alert in &summary.top_alerts {
        println!(
            "    {:<8}{}",
            s.severity(alert.severity).apply_to(alert.severity),
            alert.message
        );
    }
    println!();
}

fn print_skipped(s: &Styles, skipped: &[SkippedWatershed]) {
    for entry in skipped {
        println!(
            "    {:<12}{}",
            s.disabled.apply_to(entry.watershed.display_name()),
            s.disabled.apply_to(format!("skipped [{}] {}", entry.code, entry.message))
        );
    }
}
