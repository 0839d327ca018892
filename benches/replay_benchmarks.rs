use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use injuryrs::aggregation::{GroupAggregator, OutputView};
use injuryrs::{
    BodyPartLoad, BodyPartLocation, BodyPartSide, EngineConfig, InjuryRiskProcessor, LoadRange, SessionType,
    Side, StaticAnatomy, SymptomDescriptor, SymptomEvent, TrainingSessionSummary,
};
use rust_decimal::Decimal;

/// Performance benchmarks for the daily replay
///
/// Replays synthetic athlete histories of increasing length to check that
/// per-day cost stays flat as history grows.

const MUSCLE_GROUPS: [BodyPartLocation; 5] = [
    BodyPartLocation::QUADS,
    BodyPartLocation::CALVES,
    BodyPartLocation::HAMSTRINGS,
    BodyPartLocation::GLUTES,
    BodyPartLocation::HIP_FLEXOR,
];

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn create_symptom_history(days: i64) -> Vec<SymptomEvent> {
    (0..days)
        .flat_map(|offset| {
            let date = start_date() + Duration::days(offset);
            let timestamp = Utc.from_utc_datetime(&date.and_hms_opt(8, 0, 0).unwrap());
            let location = MUSCLE_GROUPS[offset as usize % MUSCLE_GROUPS.len()];
            let severity = (offset % 6 + 1) as u8;

            [
                SymptomEvent::new(location, Side::Left, timestamp).with(SymptomDescriptor::Ache, severity),
                SymptomEvent::new(BodyPartLocation::KNEE, Side::Right, timestamp)
                    .with(SymptomDescriptor::Tight, severity.min(3)),
            ]
        })
        .collect()
}

fn create_session_history(days: i64) -> Vec<TrainingSessionSummary> {
    let muscles = [
        BodyPartLocation::VASTUS_LATERALIS,
        BodyPartLocation::RECTUS_FEMORIS,
        BodyPartLocation::SOLEUS,
        BodyPartLocation::GLUTEUS_MAXIMUS,
        BodyPartLocation::PSOAS,
        BodyPartLocation::SEMITENDINOSUS,
    ];

    (0..days)
        .map(|offset| {
            let date = start_date() + Duration::days(offset);
            let mut session = TrainingSessionSummary::new(
                format!("session-{}", offset),
                Utc.from_utc_datetime(&date.and_hms_opt(17, 0, 0).unwrap()),
                SessionType::Practice,
            );
            session.session_rpe = Some(Decimal::from(offset % 10));
            session.body_part_loads = muscles
                .iter()
                .enumerate()
                .flat_map(|(index, muscle)| {
                    Side::BILATERAL.into_iter().map(move |side| {
                        let mut load = BodyPartLoad::new(BodyPartSide::new(*muscle, side));
                        load.eccentric_volume = LoadRange::exact(Decimal::from(10 * (index as i64 + offset % 7)));
                        load.concentric_volume = LoadRange::exact(Decimal::from(5 * (index as i64 + 1)));
                        load
                    })
                })
                .collect();
            session
        })
        .collect()
}

fn bench_replay(c: &mut Criterion) {
    let anatomy = StaticAnatomy::new();
    let mut group = c.benchmark_group("Replay");

    for &days in &[7i64, 30, 90, 365] {
        let symptoms = create_symptom_history(days);
        let sessions = create_session_history(days);
        let end = start_date() + Duration::days(days - 1);

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(
            BenchmarkId::new("process", days),
            &(symptoms, sessions),
            |b, (symptoms, sessions)| {
                b.iter(|| {
                    let mut processor = InjuryRiskProcessor::new(&anatomy, EngineConfig::default()).unwrap();
                    processor.add_symptoms(symptoms).unwrap();
                    processor.add_sessions(sessions.clone());
                    black_box(processor.process(start_date(), end).unwrap())
                });
            },
        );
    }

    group.finish();
}

fn bench_group_aggregation(c: &mut Criterion) {
    let anatomy = StaticAnatomy::new();
    let mut processor = InjuryRiskProcessor::new(&anatomy, EngineConfig::default()).unwrap();
    processor.add_symptoms(&create_symptom_history(30)).unwrap();
    processor.add_sessions(create_session_history(30));
    processor
        .process(start_date(), start_date() + Duration::days(29))
        .unwrap();

    let aggregator = GroupAggregator::new(&anatomy);
    let mut group = c.benchmark_group("Aggregation");
    for view in [OutputView::Muscle, OutputView::Group, OutputView::Viz] {
        group.bench_with_input(BenchmarkId::new("aggregate_ird", view), processor.records(), |b, records| {
            b.iter(|| black_box(aggregator.aggregate_ird(records, view)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_replay, bench_group_aggregation);
criterion_main!(benches);
