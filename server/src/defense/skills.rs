//! Hero skill book: one entry per class and slot.

use shared::{BuffKind, HeroClass, SkillSlot};

use crate::tables::{BLOODLUST_SHARE_RADIUS, RALLY_SHARE_RADIUS};

/// Geometry and effect of a skill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkillShape {
    /// Every enemy in front of the hero within `radius`.
    Cone { radius: f32 },
    /// The nearest enemy in front of the hero within `radius`.
    Single { radius: f32, stun: f32 },
    /// Every enemy on a line from the hero towards the target.
    Line { length: f32, width: f32 },
    /// Every enemy around the target point, pulled into `cast_range`.
    Circle { radius: f32, cast_range: f32 },
    /// Every enemy around the hero.
    Nova { radius: f32, stun: f32 },
    /// A circle that lands `delay` seconds after the cast.
    Delayed { radius: f32, cast_range: f32, delay: f32 },
    /// Moves the hero with invincibility, hitting enemies on the way if
    /// `damaging`.
    Dash { distance: f32, damaging: bool },
    /// Buffs the caster. Some kinds spread to allies, see [`share_radius`].
    Buff {
        kind: BuffKind,
        duration: f32,
        power: f32,
        lifesteal: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillSpec {
    pub shape: SkillShape,
    /// Multiplier on the hero's attack; zero for non-damaging skills.
    pub multiplier: f32,
    pub cooldown: f32,
}

const fn spec(shape: SkillShape, multiplier: f32, cooldown: f32) -> SkillSpec {
    SkillSpec {
        shape,
        multiplier,
        cooldown,
    }
}

/// The skill behind `slot` for `class`; `None` for the basic attack.
pub fn skill_spec(class: HeroClass, slot: SkillSlot) -> Option<SkillSpec> {
    let skill = match (class, slot) {
        (_, SkillSlot::Basic) => return None,

        (HeroClass::Warrior, SkillSlot::First) => spec(SkillShape::Cone { radius: 140.0 }, 1.8, 5.0),
        (HeroClass::Warrior, SkillSlot::Second) => spec(
            SkillShape::Buff {
                kind: BuffKind::Bloodlust,
                duration: 8.0,
                power: 0.3,
                lifesteal: 0.2,
            },
            0.0,
            15.0,
        ),
        (HeroClass::Warrior, SkillSlot::Third) => spec(
            SkillShape::Dash {
                distance: 260.0,
                damaging: true,
            },
            1.5,
            10.0,
        ),

        (HeroClass::Knight, SkillSlot::First) => spec(
            SkillShape::Single {
                radius: 90.0,
                stun: 1.5,
            },
            1.5,
            6.0,
        ),
        (HeroClass::Knight, SkillSlot::Second) => spec(
            SkillShape::Buff {
                kind: BuffKind::Bulwark,
                duration: 6.0,
                power: 0.5,
                lifesteal: 0.0,
            },
            0.0,
            16.0,
        ),
        (HeroClass::Knight, SkillSlot::Third) => spec(
            SkillShape::Buff {
                kind: BuffKind::Rally,
                duration: 10.0,
                power: 0.02,
                lifesteal: 0.0,
            },
            0.0,
            20.0,
        ),

        (HeroClass::Archer, SkillSlot::First) => spec(
            SkillShape::Line {
                length: 520.0,
                width: 30.0,
            },
            2.0,
            6.0,
        ),
        (HeroClass::Archer, SkillSlot::Second) => spec(
            SkillShape::Circle {
                radius: 150.0,
                cast_range: 450.0,
            },
            1.2,
            10.0,
        ),
        (HeroClass::Archer, SkillSlot::Third) => spec(
            SkillShape::Dash {
                distance: 220.0,
                damaging: false,
            },
            0.0,
            8.0,
        ),

        (HeroClass::Mage, SkillSlot::First) => spec(
            SkillShape::Circle {
                radius: 100.0,
                cast_range: 400.0,
            },
            1.6,
            5.0,
        ),
        (HeroClass::Mage, SkillSlot::Second) => spec(
            SkillShape::Nova {
                radius: 180.0,
                stun: 1.2,
            },
            1.0,
            12.0,
        ),
        (HeroClass::Mage, SkillSlot::Third) => spec(
            SkillShape::Delayed {
                radius: 160.0,
                cast_range: 500.0,
                delay: 1.5,
            },
            3.0,
            20.0,
        ),
    };
    Some(skill)
}

/// Radius within which copies of a shared buff spread, if it spreads.
pub fn share_radius(kind: BuffKind) -> Option<f32> {
    match kind {
        BuffKind::Bloodlust => Some(BLOODLUST_SHARE_RADIUS),
        BuffKind::Rally => Some(RALLY_SHARE_RADIUS),
        BuffKind::Invincible | BuffKind::Bulwark => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSES: [HeroClass; 4] = [
        HeroClass::Warrior,
        HeroClass::Knight,
        HeroClass::Archer,
        HeroClass::Mage,
    ];

    #[test]
    fn test_every_class_has_three_skills() {
        for class in CLASSES {
            assert!(skill_spec(class, SkillSlot::Basic).is_none());
            for slot in [SkillSlot::First, SkillSlot::Second, SkillSlot::Third] {
                let spec = skill_spec(class, slot).unwrap();
                assert!(spec.cooldown > 0.0, "{:?} {:?}", class, slot);
            }
        }
    }

    #[test]
    fn test_buffs_carry_no_damage() {
        for class in CLASSES {
            for slot in [SkillSlot::First, SkillSlot::Second, SkillSlot::Third] {
                let spec = skill_spec(class, slot).unwrap();
                if matches!(spec.shape, SkillShape::Buff { .. }) {
                    assert_eq!(spec.multiplier, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_meteor_is_delayed() {
        let meteor = skill_spec(HeroClass::Mage, SkillSlot::Third).unwrap();
        assert!(matches!(meteor.shape, SkillShape::Delayed { delay, .. } if delay == 1.5));
        assert_eq!(meteor.multiplier, 3.0);
    }

    #[test]
    fn test_only_rally_and_bloodlust_spread() {
        assert!(share_radius(BuffKind::Rally).is_some());
        assert!(share_radius(BuffKind::Bloodlust).is_some());
        assert!(share_radius(BuffKind::Bulwark).is_none());
        assert!(share_radius(BuffKind::Invincible).is_none());
    }
}
