//! Anatomical taxonomy
//!
//! The engine never hard-codes anatomy. Every component receives a read-only
//! [`AnatomyRegistry`] by reference and asks it what a location is, which
//! muscles make up a group, and which muscles sit around a joint or ligament.
//! [`StaticAnatomy`] provides the standard taxonomy.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::BodyPartLocation;

/// Tissue category of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TissueKind {
    Muscle,
    MuscleGroup,
    Joint,
    Ligament,
}

/// Read-only anatomical lookups consumed by the engine
pub trait AnatomyRegistry {
    /// Tissue category, `None` for locations the registry does not know
    fn tissue_kind(&self, location: BodyPartLocation) -> Option<TissueKind>;

    /// Constituent muscles of a group; empty for anything that is not a group
    fn group_muscles(&self, location: BodyPartLocation) -> &[BodyPartLocation];

    /// Muscle group a muscle belongs to
    fn muscle_group(&self, muscle: BodyPartLocation) -> Option<BodyPartLocation>;

    /// Coarser visualization group a muscle belongs to
    fn viz_group(&self, muscle: BodyPartLocation) -> Option<BodyPartLocation>;

    /// Whether the location exists on both sides of the body
    fn is_bilateral(&self, location: BodyPartLocation) -> bool;

    /// Muscles anatomically related to a joint or ligament
    fn related_muscles(&self, location: BodyPartLocation) -> &[BodyPartLocation];

    fn is_muscle(&self, location: BodyPartLocation) -> bool {
        self.tissue_kind(location) == Some(TissueKind::Muscle)
    }
}

/// Standard taxonomy, built once and shared by reference
#[derive(Debug, Clone)]
pub struct StaticAnatomy {
    groups: BTreeMap<BodyPartLocation, Vec<BodyPartLocation>>,
    muscle_to_group: BTreeMap<BodyPartLocation, BodyPartLocation>,
    muscle_to_viz: BTreeMap<BodyPartLocation, BodyPartLocation>,
    joints: BTreeMap<BodyPartLocation, Vec<BodyPartLocation>>,
    ligaments: BTreeMap<BodyPartLocation, Vec<BodyPartLocation>>,
    standalone_muscles: BTreeSet<BodyPartLocation>,
    unilateral: BTreeSet<BodyPartLocation>,
}

impl StaticAnatomy {
    pub fn new() -> Self {
        use BodyPartLocation as L;

        let groups: BTreeMap<_, _> = [
            (L::SHIN, vec![L::ANTERIOR_TIBIALIS, L::PERONEALS_LONGUS]),
            (
                L::CALVES,
                vec![
                    L::POSTERIOR_TIBIALIS,
                    L::SOLEUS,
                    L::GASTROCNEMIUS_MEDIAL,
                    L::GASTROCNEMIUS_LATERAL,
                    L::POPLITEUS,
                ],
            ),
            (
                L::HAMSTRINGS,
                vec![
                    L::BICEP_FEMORIS_LONG_HEAD,
                    L::BICEP_FEMORIS_SHORT_HEAD,
                    L::SEMIMEMBRANOSUS,
                    L::SEMITENDINOSUS,
                ],
            ),
            (
                L::GROIN,
                vec![
                    L::ADDUCTOR_LONGUS,
                    L::ADDUCTOR_MAGNUS_ANTERIOR,
                    L::ADDUCTOR_MAGNUS_POSTERIOR,
                    L::ADDUCTOR_BREVIS,
                    L::GRACILIS,
                    L::PECTINEUS,
                ],
            ),
            (
                L::QUADS,
                vec![
                    L::VASTUS_LATERALIS,
                    L::VASTUS_MEDIALIS,
                    L::VASTUS_INTERMEDIUS,
                    L::RECTUS_FEMORIS,
                ],
            ),
            (L::HIP_FLEXOR, vec![L::TENSOR_FASCIA_LATAE, L::PSOAS, L::ILIACUS]),
            (L::DEEP_ROTATORS_HIP, vec![L::PIRIFORMIS, L::QUADRATUS_FEMORIS]),
            (
                L::CORE_STABILIZERS,
                vec![
                    L::TRANSVERSE_ABDOMINIS,
                    L::INTRINSIC_MUSCLES_OF_SPINE,
                    L::DIAPHRAGM,
                    L::PELVIC_FLOOR,
                ],
            ),
            (L::OBLIQUES, vec![L::INTERNAL_OBLIQUES, L::EXTERNAL_OBLIQUES]),
            (
                L::GLUTES,
                vec![
                    L::GLUTEUS_MEDIUS_ANTERIOR,
                    L::GLUTEUS_MEDIUS_POSTERIOR,
                    L::GLUTEUS_MINIMUS,
                    L::GLUTEUS_MAXIMUS,
                ],
            ),
            (L::FOREARM, vec![L::FOREARM_INTRINSIC, L::FOREARM_EXTRINSIC]),
            (
                L::BICEPS,
                vec![L::BRACHIALIS, L::BICEPS_BRACHII, L::BRACHIORADIALIS, L::CORACOBRACHIALIS],
            ),
            (
                L::TRICEPS,
                vec![L::TRICEP_MEDIAL_HEAD, L::TRICEP_LATERAL_HEAD, L::TRICEP_LONG_HEAD],
            ),
            (
                L::DELTOID,
                vec![L::ANTERIOR_DELTOID, L::MEDIAL_DELTOID, L::POSTERIOR_DELTOID],
            ),
            (L::CHEST, vec![L::PECTORALIS_MINOR, L::PECTORALIS_MAJOR]),
            (
                L::UPPER_BACK_NECK,
                vec![
                    L::UPPER_TRAPEZIUS,
                    L::LEVATOR_SCAPULAE,
                    L::MIDDLE_TRAPEZIUS,
                    L::LOWER_TRAPEZIUS,
                    L::RHOMBOIDS,
                ],
            ),
            (L::LATS, vec![L::LATISSIMUS_DORSI, L::TERES_MAJOR]),
            (L::ABDOMINALS, vec![L::RECTUS_ABDOMINIS]),
            (L::LOWER_BACK, vec![L::ERECTOR_SPINAE, L::QUADRATUS_LUMBORUM]),
            (
                L::ROTATOR_CUFF,
                vec![L::SUPRASPINATUS, L::SUBSCAPULARIS, L::INFRASPINATUS, L::TERES_MINOR],
            ),
        ]
        .into_iter()
        .collect();

        let viz_groups: BTreeMap<_, _> = [
            (
                L::SEMIMEMBRANOSUS_SEMITENDINOSUS,
                vec![L::SEMIMEMBRANOSUS, L::SEMITENDINOSUS],
            ),
            (
                L::ANTERIOR_ADDUCTORS,
                vec![
                    L::ADDUCTOR_LONGUS,
                    L::ADDUCTOR_MAGNUS_ANTERIOR,
                    L::ADDUCTOR_BREVIS,
                    L::ADDUCTOR_MAGNUS_POSTERIOR,
                ],
            ),
            (
                L::RECTUS_FEMORIS_VASTUS_INTERMEDIUS,
                vec![L::RECTUS_FEMORIS, L::VASTUS_INTERMEDIUS],
            ),
            (L::HIP_FLEXOR_MERGE, vec![L::PSOAS, L::ILIACUS]),
            (L::DEEP_ROTATORS_HIP, vec![L::PIRIFORMIS, L::QUADRATUS_FEMORIS]),
            (
                L::GLUTE_MED,
                vec![
                    L::GLUTEUS_MEDIUS_ANTERIOR,
                    L::GLUTEUS_MEDIUS_POSTERIOR,
                    L::GLUTEUS_MINIMUS,
                ],
            ),
            (L::OBLIQUES, vec![L::INTERNAL_OBLIQUES, L::EXTERNAL_OBLIQUES]),
            (
                L::UPPER_TRAPS_LEVATOR_SCAPULAE,
                vec![L::UPPER_TRAPEZIUS, L::LEVATOR_SCAPULAE],
            ),
            (L::MIDDLE_TRAPS_RHOMBOIDS, vec![L::MIDDLE_TRAPEZIUS, L::RHOMBOIDS]),
            (L::PEC_MAJOR_MINOR, vec![L::PECTORALIS_MINOR, L::PECTORALIS_MAJOR]),
            (L::FOREARM, vec![L::FOREARM_INTRINSIC, L::FOREARM_EXTRINSIC]),
            (
                L::BICEPS,
                vec![L::BRACHIALIS, L::BICEPS_BRACHII, L::BRACHIORADIALIS, L::CORACOBRACHIALIS],
            ),
            (
                L::TRICEPS,
                vec![L::TRICEP_MEDIAL_HEAD, L::TRICEP_LATERAL_HEAD, L::TRICEP_LONG_HEAD],
            ),
            (L::LATS, vec![L::LATISSIMUS_DORSI, L::TERES_MAJOR]),
        ]
        .into_iter()
        .collect();

        let joints: BTreeMap<_, _> = [
            (
                L::FOOT,
                vec![
                    L::ANTERIOR_TIBIALIS,
                    L::PERONEALS_LONGUS,
                    L::POSTERIOR_TIBIALIS,
                    L::SOLEUS,
                    L::GASTROCNEMIUS_MEDIAL,
                ],
            ),
            (
                L::ANKLE,
                vec![L::PERONEALS_LONGUS, L::SOLEUS, L::GASTROCNEMIUS_MEDIAL],
            ),
            (
                L::KNEE,
                vec![
                    L::BICEP_FEMORIS_SHORT_HEAD,
                    L::SEMIMEMBRANOSUS,
                    L::SEMITENDINOSUS,
                    L::VASTUS_LATERALIS,
                    L::VASTUS_MEDIALIS,
                    L::VASTUS_INTERMEDIUS,
                    L::RECTUS_FEMORIS,
                    L::SARTORIUS,
                ],
            ),
            (
                L::HIP,
                vec![
                    L::BICEP_FEMORIS_LONG_HEAD,
                    L::SEMIMEMBRANOSUS,
                    L::SEMITENDINOSUS,
                    L::ADDUCTOR_LONGUS,
                    L::ADDUCTOR_MAGNUS_ANTERIOR,
                    L::ADDUCTOR_MAGNUS_POSTERIOR,
                    L::ADDUCTOR_BREVIS,
                    L::GRACILIS,
                    L::PECTINEUS,
                    L::RECTUS_FEMORIS,
                    L::TENSOR_FASCIA_LATAE,
                    L::PIRIFORMIS,
                    L::GASTROCNEMIUS_LATERAL,
                    L::SARTORIUS,
                    L::GLUTEUS_MEDIUS_ANTERIOR,
                    L::GLUTEUS_MEDIUS_POSTERIOR,
                    L::GLUTEUS_MINIMUS,
                    L::GLUTEUS_MAXIMUS,
                ],
            ),
            (
                L::SHOULDER,
                vec![
                    L::ANTERIOR_DELTOID,
                    L::PECTORALIS_MINOR,
                    L::BICEPS_BRACHII,
                    L::TRICEP_LONG_HEAD,
                    L::SUPRASPINATUS,
                    L::INFRASPINATUS,
                ],
            ),
            (
                L::ELBOW,
                vec![
                    L::BRACHIALIS,
                    L::BICEPS_BRACHII,
                    L::BRACHIORADIALIS,
                    L::FOREARM_INTRINSIC,
                    L::FOREARM_EXTRINSIC,
                ],
            ),
            (L::WRIST, vec![L::FOREARM_INTRINSIC, L::FOREARM_EXTRINSIC]),
        ]
        .into_iter()
        .collect();

        let ligaments: BTreeMap<_, _> = [
            (L::IT_BAND, vec![L::TENSOR_FASCIA_LATAE]),
            (L::IT_BAND_LATERAL_KNEE, vec![L::TENSOR_FASCIA_LATAE]),
            (L::ACHILLES, vec![L::SOLEUS, L::GASTROCNEMIUS_MEDIAL]),
        ]
        .into_iter()
        .collect();

        let mut muscle_to_group = BTreeMap::new();
        for (group, muscles) in &groups {
            for muscle in muscles {
                muscle_to_group.insert(*muscle, *group);
            }
        }

        let mut muscle_to_viz = BTreeMap::new();
        for (viz, muscles) in &viz_groups {
            for muscle in muscles {
                muscle_to_viz.insert(*muscle, *viz);
            }
        }

        let standalone_muscles = [L::SERRATUS_ANTERIOR].into_iter().collect();

        let unilateral = [
            L::HEAD,
            L::ABDOMINALS,
            L::LOWER_BACK,
            L::CORE_STABILIZERS,
            L::INTRINSIC_MUSCLES_OF_SPINE,
            L::DIAPHRAGM,
            L::PELVIC_FLOOR,
            L::TRANSVERSE_ABDOMINIS,
            L::RECTUS_ABDOMINIS,
        ]
        .into_iter()
        .collect();

        StaticAnatomy {
            groups,
            muscle_to_group,
            muscle_to_viz,
            joints,
            ligaments,
            standalone_muscles,
            unilateral,
        }
    }
}

impl Default for StaticAnatomy {
    fn default() -> Self {
        Self::new()
    }
}

impl AnatomyRegistry for StaticAnatomy {
    fn tissue_kind(&self, location: BodyPartLocation) -> Option<TissueKind> {
        if self.joints.contains_key(&location) {
            Some(TissueKind::Joint)
        } else if self.ligaments.contains_key(&location) {
            Some(TissueKind::Ligament)
        } else if self.groups.contains_key(&location) {
            Some(TissueKind::MuscleGroup)
        } else if self.muscle_to_group.contains_key(&location)
            || self.standalone_muscles.contains(&location)
        {
            Some(TissueKind::Muscle)
        } else {
            None
        }
    }

    fn group_muscles(&self, location: BodyPartLocation) -> &[BodyPartLocation] {
        self.groups.get(&location).map(Vec::as_slice).unwrap_or(&[])
    }

    fn muscle_group(&self, muscle: BodyPartLocation) -> Option<BodyPartLocation> {
        self.muscle_to_group.get(&muscle).copied()
    }

    fn viz_group(&self, muscle: BodyPartLocation) -> Option<BodyPartLocation> {
        self.muscle_to_viz.get(&muscle).copied()
    }

    fn is_bilateral(&self, location: BodyPartLocation) -> bool {
        !self.unilateral.contains(&location)
    }

    fn related_muscles(&self, location: BodyPartLocation) -> &[BodyPartLocation] {
        self.joints
            .get(&location)
            .or_else(|| self.ligaments.get(&location))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tissue_kinds() {
        let anatomy = StaticAnatomy::new();

        assert_eq!(
            anatomy.tissue_kind(BodyPartLocation::QUADS),
            Some(TissueKind::MuscleGroup)
        );
        assert_eq!(
            anatomy.tissue_kind(BodyPartLocation::VASTUS_LATERALIS),
            Some(TissueKind::Muscle)
        );
        assert_eq!(anatomy.tissue_kind(BodyPartLocation::KNEE), Some(TissueKind::Joint));
        assert_eq!(
            anatomy.tissue_kind(BodyPartLocation::ACHILLES),
            Some(TissueKind::Ligament)
        );
        assert_eq!(anatomy.tissue_kind(BodyPartLocation(999)), None);
    }

    #[test]
    fn test_group_and_viz_lookup() {
        let anatomy = StaticAnatomy::new();

        assert_eq!(anatomy.group_muscles(BodyPartLocation::QUADS).len(), 4);
        assert_eq!(
            anatomy.muscle_group(BodyPartLocation::PSOAS),
            Some(BodyPartLocation::HIP_FLEXOR)
        );
        assert_eq!(
            anatomy.viz_group(BodyPartLocation::PSOAS),
            Some(BodyPartLocation::HIP_FLEXOR_MERGE)
        );
        assert_eq!(anatomy.viz_group(BodyPartLocation::VASTUS_LATERALIS), None);
        assert!(anatomy.group_muscles(BodyPartLocation::KNEE).is_empty());
    }

    #[test]
    fn test_every_group_muscle_is_a_muscle() {
        let anatomy = StaticAnatomy::new();

        for (location, _) in BodyPartLocation::NAMED {
            for muscle in anatomy.group_muscles(*location) {
                assert!(anatomy.is_muscle(*muscle), "{} is not a muscle", muscle);
            }
            for muscle in anatomy.related_muscles(*location) {
                assert!(anatomy.is_muscle(*muscle), "{} is not a muscle", muscle);
            }
        }
    }

    #[test]
    fn test_bilateral_flags() {
        let anatomy = StaticAnatomy::new();

        assert!(anatomy.is_bilateral(BodyPartLocation::QUADS));
        assert!(anatomy.is_bilateral(BodyPartLocation::ACHILLES));
        assert!(!anatomy.is_bilateral(BodyPartLocation::LOWER_BACK));
        assert!(!anatomy.is_bilateral(BodyPartLocation::RECTUS_ABDOMINIS));
    }
}
