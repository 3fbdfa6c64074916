//! Prompt construction for the reasoning service.
//!
//! Every request is a fresh two-message conversation: the persona as the
//! system message and a user message assembled from the decision memory,
//! the body's position, the raw perception text and guidance that depends on
//! whether (and how) the reference actor is visible.

use waggle_perception::{FovConstraint, PerceptionSnapshot};
use waggle_types::{DECISION_WINDOW_SECS, ReferenceActorSnapshot, Vec3};

use crate::llm_driver::{ChatMessage, Role};
use crate::memory::DecisionMemory;

/// Persona given to the model as the system message.
pub const PERSONA_PROMPT: &str = "\
You are a gentle, affectionate robot dog. You like staying close to your \
owner while keeping a safe distance. From what you perceive you choose where \
to move next (x,y,z) and how to move your limbs: raising a paw (wave) and \
raising or turning your head (look).";

/// Speed scale band when the reference actor is interactable.
pub const SPEED_BAND_INTERACTABLE: (f32, f32) = (0.8, 1.2);
/// Speed scale band when the reference actor is present but not interactable.
pub const SPEED_BAND_CAUTIOUS: (f32, f32) = (0.5, 0.8);
/// Speed scale band when no reference actor is perceived.
pub const SPEED_BAND_EXPLORING: (f32, f32) = (1.2, 2.0);

/// Everything the user message is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub memory: &'a DecisionMemory,
    pub position: Vec3,
    pub snapshot: &'a PerceptionSnapshot,
    /// `None` when target correction is disabled.
    pub fov: Option<FovConstraint>,
    pub reference_tag: &'a str,
}

/// Speed band the model should pick from for this reference state.
pub fn speed_band(reference: &ReferenceActorSnapshot) -> (f32, f32) {
    match (reference.valid, reference.interactable) {
        (true, true) => SPEED_BAND_INTERACTABLE,
        (true, false) => SPEED_BAND_CAUTIOUS,
        _ => SPEED_BAND_EXPLORING,
    }
}

/// System + user messages for one decision request.
pub fn build_messages(ctx: &PromptContext<'_>) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: Role::System,
            content: PERSONA_PROMPT.to_string(),
        },
        ChatMessage {
            role: Role::User,
            content: build_user_message(ctx),
        },
    ]
}

pub fn build_user_message(ctx: &PromptContext<'_>) -> String {
    let mut lines = Vec::new();
    memory_section(ctx.memory, &mut lines);

    lines.push("=== Current situation ===".to_string());
    let p = ctx.position;
    lines.push(format!("Your position: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z));
    lines.push("Perception:".to_string());
    lines.push(ctx.snapshot.text.trim_end().to_string());

    reference_section(ctx, &mut lines);
    output_section(&ctx.snapshot.reference, &mut lines);
    lines.join("\n")
}

fn memory_section(memory: &DecisionMemory, lines: &mut Vec<String>) {
    if memory.is_empty() {
        return;
    }
    lines.push("=== Recent decisions (oldest first) ===".to_string());
    let total = memory.len();
    for (i, reason) in memory.reasons().enumerate() {
        lines.push(format!("{} decision(s) ago: {reason}", total - i));
    }
    if memory.is_repeating() {
        lines.push(format!(
            "You have given the same reason {} times in a row. Vary your plan now: pick a different target and different gestures.",
            memory.repeated_streak()
        ));
    }
}

fn reference_section(ctx: &PromptContext<'_>, lines: &mut Vec<String>) {
    let reference = &ctx.snapshot.reference;
    let tag = ctx.reference_tag;
    let here = ctx.position;
    if !reference.valid {
        lines.push(format!(
            "No {tag} is in view. Explore: pick a direction and move 1-2 metres, with small limb angles."
        ));
        return;
    }

    let r = reference.position;
    let distance = here.flat_distance(r);
    lines.push(format!(
        "{tag} at ({:.2}, {:.2}, {:.2}), {distance:.2} m away.",
        r.x, r.y, r.z
    ));

    if !reference.interactable {
        lines.push(format!(
            "The {tag} is NOT interactable. Be cautious: think of two or three safe options (stay near and watch, circle a little, step back) and pick one. Keep limb angles small (0-30 degrees)."
        ));
        return;
    }

    lines.push(format!(
        "The {tag} is interactable. Move closer than you are now, ending 1-2 m from them or 50-80% of the way there."
    ));
    lines.push(
        "Greet them with generous angles: wave vertical 60-150, look vertical 20-30, horizontal 10-45. Wave vertical must stay in [0,180] and look vertical in [0,30]."
            .to_string(),
    );
    if let Some(fov) = ctx.fov {
        lines.push(format!(
            "Their field of view is a cone of half-angle {:.0} degrees and radius {:.1} m around the direction they face. Decide whether to end inside or outside it and start your reason with fov:inside or fov:outside.",
            fov.half_angle_deg(),
            fov.max_radius()
        ));
    }
}

fn output_section(reference: &ReferenceActorSnapshot, lines: &mut Vec<String>) {
    let (low, high) = speed_band(reference);
    lines.push("=== Output format ===".to_string());
    lines.push("Answer with exactly two lines:".to_string());
    lines.push("Line 1: a short reason (no coordinates or angles).".to_string());
    lines.push("Line 2: x,y,z,speed,action_sequence,path_type".to_string());
    lines.push(format!(
        "speed must lie in [{low:.1}, {high:.1}] for this situation; clamp it into that range before answering."
    ));
    lines.push(format!(
        "action_sequence plans the next {DECISION_WINDOW_SECS:.0} seconds; durations must add up to exactly {DECISION_WINDOW_SECS:.1}. Steps:"
    ));
    for step in [
        "  wait:d                pause and hold still (navigation pauses too)",
        "  wave:v:d              raise the paw to vertical angle v",
        "  wave:h:v:d            paw to horizontal h and vertical v",
        "  look:v:d              raise the head to vertical angle v",
        "  look:h:v:d            head to horizontal h and vertical v",
        "  continuous_wave:d     four enthusiastic waves; shorter d waves faster",
        "  head_look_at_human:d  keep the head turned towards the owner",
    ] {
        lines.push(step.to_string());
    }
    lines.push("Example: wait:1.0,wave:25:80:2.0,look:15:25:2.0".to_string());
    lines.push("path_type is straight (direct) or scurve (a graceful S-shaped path).".to_string());
    lines.push("No markdown, headings or extra text.".to_string());
}
