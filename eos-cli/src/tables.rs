use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use eos_core::{
    BestResult,
    Decision,
    Fleet,
    Trajectory,
    objective::Loss,
    trajectory::EnergySystem,
};
use eos_quantities::{Euros, KilowattHourPrice, KilowattHours, Zero};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

const fn decision_color(decision: Decision) -> Color {
    match decision {
        Decision::Idle => Color::Reset,
        Decision::Charge(_) => Color::Green,
        Decision::Discharge(_) => Color::DarkYellow,
        Decision::Curtail(_) => Color::Magenta,
    }
}

pub fn build_steps_table(fleet: &Fleet, trajectory: &Trajectory) -> Table {
    #[expect(clippy::cast_precision_loss)]
    let mean_price = if trajectory.is_empty() {
        KilowattHourPrice::ZERO
    } else {
        trajectory.steps.iter().map(|step| step.conditions.import_price).sum::<KilowattHourPrice>()
            / trajectory.len() as f64
    };

    let mut table = new_table();
    let mut header = vec!["Date", "Start", "End", "Demand", "Import", "Export"];
    header.extend(fleet.devices().iter().map(|spec| spec.id.as_str()));
    header.extend(["Grid in", "Grid out", "Cost"]);
    table.set_header(header);

    for step in &trajectory.steps {
        let mut row = vec![
            Cell::new(step.interval.start.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(step.interval.start.format("%H:%M")),
            Cell::new(step.interval.end.format("%H:%M")).add_attribute(Attribute::Dim),
            Cell::new(step.conditions.demand).set_alignment(CellAlignment::Right),
            Cell::new(step.conditions.import_price).fg(
                if step.conditions.import_price >= mean_price { Color::Red } else { Color::Green },
            ),
            Cell::new(step.conditions.export_price).add_attribute(Attribute::Dim),
        ];
        row.extend(step.devices.iter().map(|device| {
            let decision = device.state.decision;
            let content = match device.state.level {
                Some(level) => format!("{decision}\n{level}"),
                None => decision.to_string(),
            };
            let cell = Cell::new(content).fg(decision_color(decision));
            if decision.is_idle() { cell.add_attribute(Attribute::Dim) } else { cell }
        }));
        row.extend([
            Cell::new(step.grid.import).set_alignment(CellAlignment::Right).fg(
                if step.grid.import >= KilowattHours::EPSILON { Color::Red } else { Color::Green },
            ),
            Cell::new(step.grid.export).set_alignment(CellAlignment::Right),
            Cell::new(step.grid_cost)
                .set_alignment(CellAlignment::Right)
                .fg(if step.grid_cost >= Euros::ONE_CENT { Color::Red } else { Color::Green }),
        ]);
        table.add_row(row);
    }
    table
}

pub fn build_loss_table(loss: Loss, energy: &EnergySystem) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Term", "Value"]);
    let rows = [
        ("Grid", loss.grid.to_string()),
        ("Wear", loss.wear.to_string()),
        ("Residual", loss.residual.to_string()),
        ("Car charge", loss.car_charge.to_string()),
        ("Total", loss.total().to_string()),
        ("Produced", energy.produced.to_string()),
        ("Consumed", energy.consumed.to_string()),
        ("Charged", energy.charged.to_string()),
        ("Discharged", energy.discharged.to_string()),
        ("Imported", energy.imported.to_string()),
        ("Exported", energy.exported.to_string()),
    ];
    for (term, value) in rows {
        table.add_row(vec![Cell::new(term), Cell::new(value).set_alignment(CellAlignment::Right)]);
    }
    table
}

pub fn build_run_table(result: &BestResult) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Termination", "Iterations", "Evaluations", "Rejected", "Took", "Score"]);
    table.add_row(vec![
        Cell::new(result.termination).fg(Color::Cyan),
        Cell::new(format!("{} of {}", result.n_iterations, result.budget.max_iterations))
            .set_alignment(CellAlignment::Right),
        Cell::new(result.n_evaluations).set_alignment(CellAlignment::Right),
        Cell::new(result.n_rejected)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Dim),
        Cell::new(humantime::format_duration(result.elapsed)),
        Cell::new(result.score),
    ]);
    table
}
