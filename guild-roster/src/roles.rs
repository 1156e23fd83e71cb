//! Role mapper: Raid Helper class/spec tags to roster role labels
//!
//! Rules are tested in order against the lowercased "class spec" text and
//! the first match wins. Tags often match several keyword sets, so the
//! order of `ROLE_RULES` is part of the contract.

use guild_common::db::RoleLabel;

const ROLE_RULES: &[(&[&str], RoleLabel)] = &[
    (&["tank"], RoleLabel::OffTank),
    (&["heal"], RoleLabel::Healer),
    (&["arcane"], RoleLabel::SupportArcane),
    (&["silence"], RoleLabel::SupportSilence),
    (&["frost"], RoleLabel::FrostDps),
    (&["fire"], RoleLabel::FireDps),
    (&["bow", "crossbow", "x-bow"], RoleLabel::RangedDps),
    (&["eagle", "aguia", "águia"], RoleLabel::RangedDps2),
    (&["scout"], RoleLabel::Scout),
    (&["debuff"], RoleLabel::Debuff),
    (&["root", "raiz"], RoleLabel::Root),
    (&["troll", "role"], RoleLabel::Decoy),
    (&["hidden", "oculto"], RoleLabel::Stealth),
];

/// Map free-text class and spec tags to a role label
///
/// No match yields `RoleLabel::Dps`.
pub fn map_role(class_tag: Option<&str>, spec_tag: Option<&str>) -> RoleLabel {
    let text = format!(
        "{} {}",
        class_tag.unwrap_or_default(),
        spec_tag.unwrap_or_default()
    )
    .to_lowercase();

    ROLE_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, role)| *role)
        .unwrap_or(RoleLabel::Dps)
}
