//! Command implementations. Each returns the text to print.

use std::fmt::Write;

use anyhow::anyhow;
use robot_core::autoload::AutoLoadOutcome;
use robot_core::parameters::{ParameterUpdate, RobotParameterState};
use robot_core::pipeline::SubmitOutcome;
use robot_core::preset::{PresetDraft, PresetSource};
use robot_core::solver::Solver;
use robot_core::store::{ParameterField, ParameterStore};
use robot_core::tendon::TendonConfig;
use robot_core::validation::validate;
use robot_core::{ComputedConfiguration, Workbench};

use crate::cli::{parse_indexed, SetArgs};

/// Apply `set` arguments.
///
/// Every edit is staged on a copy of the current state and committed with a
/// single store write, so a bad INDEX=VALUE pair leaves the store untouched.
pub fn apply_set(store: &mut ParameterStore, args: &SetArgs) -> anyhow::Result<RobotParameterState> {
    let mut edits = Vec::new();
    for (field, pairs) in [
        (ParameterField::BendingAngle, &args.bend),
        (ParameterField::RotationAngle, &args.rotate),
        (ParameterField::BackboneLength, &args.backbone),
        (ParameterField::CouplingLength, &args.coupling),
        (ParameterField::TendonRadius, &args.radius),
    ] {
        for raw in pairs {
            let (index, value) = parse_indexed(raw)?;
            edits.push((field, index, value));
        }
    }

    let defaults = store.defaults().clone();
    let mut staged = store.snapshot();
    if let Some(segments) = args.segments {
        staged = staged.apply(ParameterUpdate::new().segments(segments), &defaults);
    }
    if let Some(steps) = args.steps {
        staged = staged.apply(ParameterUpdate::new().discretization_steps(steps), &defaults);
    }
    if args.no_tendons {
        staged = staged.apply(ParameterUpdate::new().without_tendons(), &defaults);
    }
    if args.tendons.is_some() || args.offset.is_some() {
        let mut tendons = staged.tendon_config.clone().unwrap_or_else(|| {
            TendonConfig::uniform(defaults.tendon_count, defaults.tendon_radius_m, staged.coupling_count())
        });
        if let Some(count) = args.tendons {
            tendons.count = count;
        }
        if let Some(offset) = args.offset {
            tendons.coupling_offset = offset;
        }
        staged = staged.apply(ParameterUpdate::new().tendon_config(tendons), &defaults);
    }

    for (field, index, value) in edits {
        let update = field
            .update_for(&staged, index, value)
            .ok_or_else(|| anyhow!("{} has no index {}", field, index))?;
        staged = staged.apply(update, &defaults);
    }

    Ok(store.set(ParameterUpdate::replace_all(staged)).clone())
}

pub fn render_state(state: &RobotParameterState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "segments: {}  discretization steps: {}", state.segments, state.discretization_steps);
    let _ = writeln!(out, "  #  bend (deg)  rotate (deg)  backbone (m)");
    for i in 0..state.segments as usize {
        let _ = writeln!(
            out,
            "{:>3}  {:>10.2}  {:>12.2}  {:>12.4}",
            i,
            state.bending_angles.get(i).copied().unwrap_or_default(),
            state.rotation_angles.get(i).copied().unwrap_or_default(),
            state.backbone_lengths.get(i).copied().unwrap_or_default(),
        );
    }
    let _ = write!(out, "couplings (m): {}", join(&state.coupling_lengths));
    match &state.tendon_config {
        Some(tendons) => {
            let _ = write!(
                out,
                "\ntendons: {}  offset: {} m  radius (m): {}",
                tendons.count,
                tendons.coupling_offset,
                join(&tendons.radius)
            );
        }
        None => out.push_str("\ntendons: none"),
    }
    out
}

pub fn render_snapshot(snapshot: &ComputedConfiguration) -> String {
    let Some(shape) = snapshot.shape() else {
        return "No solved shape".to_string();
    };
    let mut out = format!("Solved: {} point sequences, {} points", shape.segment_count(), shape.point_count());
    if let Some([x, y, z]) = shape.tip() {
        let _ = write!(out, "\ntip: ({:.4}, {:.4}, {:.4}) m", x, y, z);
    }
    if let Some(tendons) = &shape.tendons {
        for (name, command) in &tendons.actuation_commands {
            let _ = write!(
                out,
                "\ntendon {}: {:?} {:.2} mm",
                name,
                command.pull_direction,
                command.magnitude * 1000.0
            );
        }
    }
    out
}

pub fn validate_current(state: &RobotParameterState) -> anyhow::Result<String> {
    validate(state)?;
    Ok("Configuration is valid".to_string())
}

pub async fn solve<S: Solver + 'static>(bench: &Workbench<S>) -> anyhow::Result<String> {
    match bench.pipeline().submit().await {
        SubmitOutcome::Completed => Ok(render_snapshot(&bench.pipeline().snapshot())),
        SubmitOutcome::Rejected(err) | SubmitOutcome::Failed(err) => Err(anyhow!("{}", err)),
        other => Err(anyhow!("solve did not run: {:?}", other)),
    }
}

pub async fn list_presets<P: PresetSource>(source: &P, mine: bool) -> anyhow::Result<String> {
    let presets = if mine {
        source.get_user_presets().await?
    } else {
        source.list_public_presets().await?
    };
    if presets.is_empty() {
        return Ok("No presets".to_string());
    }
    let lines: Vec<String> = presets
        .iter()
        .map(|p| {
            format!(
                "{:>5}  {:<30}  {:<7}  {}",
                p.id,
                p.name,
                if p.is_public { "public" } else { "private" },
                p.description.as_deref().unwrap_or("")
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

pub async fn load<S, P>(bench: &Workbench<S>, source: &P, id: i64, then_solve: bool) -> anyhow::Result<String>
where
    S: Solver + 'static,
    P: PresetSource,
{
    let receipt = bench.transactions().load_preset(source, id).await?;
    let mut out = format!(
        "Loaded preset {} ({} segments, reload key {})",
        id, receipt.parameters.segments, receipt.reload_key
    );
    if then_solve {
        out.push('\n');
        out.push_str(&solve(bench).await?);
    }
    Ok(out)
}

pub async fn save<P: PresetSource>(
    state: &RobotParameterState,
    source: &P,
    name: &str,
    description: Option<&str>,
    public: bool,
) -> anyhow::Result<String> {
    let mut draft = PresetDraft::from_state(name, state)?.public(public);
    if let Some(description) = description {
        draft = draft.with_description(description);
    }
    let preset = source.create_preset(draft).await?;
    Ok(format!("Saved preset {} '{}'", preset.id, preset.name))
}

pub async fn delete<P: PresetSource>(source: &P, id: i64) -> anyhow::Result<String> {
    source.delete_preset(id).await?;
    Ok(format!("Deleted preset {}", id))
}

pub async fn auto<S, P>(bench: &Workbench<S>, source: &P) -> String
where
    S: Solver + 'static,
    P: PresetSource,
{
    match bench.bootstrap(source).await {
        AutoLoadOutcome::Loaded { preset_id, submit } => {
            let mut out = format!("Auto-loaded preset {}", preset_id);
            match submit {
                SubmitOutcome::Completed => {
                    out.push('\n');
                    out.push_str(&render_snapshot(&bench.pipeline().snapshot()));
                }
                SubmitOutcome::Rejected(err) | SubmitOutcome::Failed(err) => {
                    let _ = write!(out, "\nsolve failed: {}", err);
                }
                other => {
                    let _ = write!(out, "\nsolve did not run: {:?}", other);
                }
            }
            out
        }
        AutoLoadOutcome::NoPreset => "No public presets; keeping current parameters".to_string(),
        AutoLoadOutcome::Failed(_) => "Default preset unavailable; keeping current parameters".to_string(),
        other => format!("Auto-load not run: {:?}", other),
    }
}

fn join(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
