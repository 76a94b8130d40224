use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analytics::{self, Averages, Employee, TrendSample};
use crate::cli::OverviewArgs;
use crate::db::{load_employees, load_entries, open_database, resolve_db_path};

#[derive(Debug, Serialize)]
struct OverviewResponse {
    averages: Averages,
    top_performers: Vec<Employee>,
    trend: Vec<TrendSample>,
}

pub fn run(args: OverviewArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.cache_root, args.db_path);
    let connection = open_database(&db_path)?;

    let entries = load_entries(&connection)?;
    let employees = load_employees(&connection)?;

    let response = OverviewResponse {
        averages: analytics::averages(&entries),
        top_performers: analytics::top_performers(&employees, args.top),
        trend: analytics::trend_series(&entries),
    };

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &response)
            .context("failed to serialize overview json output")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    write_text_response(&response)
}

fn write_text_response(response: &OverviewResponse) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Average QA score: {}%", response.averages.average_score)?;
    writeln!(
        output,
        "Total submissions: {}",
        response.averages.total_submissions
    )?;
    writeln!(
        output,
        "Compliance rate (score >= 90): {}%",
        response.averages.compliance_rate
    )?;

    writeln!(output, "Top performers:")?;
    for (rank, employee) in response.top_performers.iter().enumerate() {
        writeln!(
            output,
            "  {}. {}\tsubmissions={}\tscore={:.1}%",
            rank + 1,
            employee.name,
            employee.submissions,
            employee.score
        )?;
    }

    writeln!(output, "Trend:")?;
    for sample in &response.trend {
        writeln!(output, "  {}\tscore={}", sample.label, sample.score)?;
    }

    output.flush()?;
    Ok(())
}
