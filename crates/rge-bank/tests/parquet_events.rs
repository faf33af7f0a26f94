use std::path::PathBuf;

use approx::assert_relative_eq;
use rge_bank::{
    BankContainer, BankRegistry, FMT_TRACKS, ParquetEventSource, REC_PARTICLE, REC_TRACK,
    bank_rows, write_event_parquet,
};
use rge_core::{EventRows, RowSource};

fn tmp_path(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("rge_bank_{name}_{}_{}.parquet", std::process::id(), nanos))
}

#[test]
fn events_read_back_through_containers() {
    let reg = BankRegistry::clas12();
    let part = reg.get(REC_PARTICLE).unwrap();
    let trk = reg.get(REC_TRACK).unwrap();
    let fmt = reg.get(FMT_TRACKS).unwrap();

    let first = EventRows::new()
        .with_bank(
            REC_PARTICLE,
            bank_rows(
                &part,
                &[
                    &[("pid", 11.0), ("pz", 5.5), ("charge", -1.0), ("status", -2010.0)],
                    &[("pid", 211.0), ("pz", 1.25), ("charge", 1.0), ("status", 2110.0)],
                ],
            ).unwrap(),
        )
        .with_bank(REC_TRACK, bank_rows(&trk, &[&[("pindex", 0.0), ("chi2", 12.0), ("NDF", 3.0)]]).unwrap());
    // Second event carries no track rows at all.
    let second = EventRows::new()
        .with_bank(REC_PARTICLE, bank_rows(&part, &[&[("pid", 2212.0), ("charge", 1.0)]]).unwrap());

    let path = tmp_path("roundtrip");
    write_event_parquet(&path, &[&*part, &*trk, &*fmt], &[first, second]).unwrap();

    let mut src = ParquetEventSource::open(&path).unwrap();
    assert_eq!(src.n_events(), 2);
    reg.get(REC_TRACK).unwrap().check_fields(src.schema(REC_TRACK).unwrap()).unwrap();
    assert_eq!(src.bank_ids().collect::<Vec<_>>(), vec![FMT_TRACKS, REC_PARTICLE, REC_TRACK]);

    let mut particles = BankContainer::from_schema(part.clone());
    let mut tracks = BankContainer::from_schema(trk.clone());
    let mut fmt_tracks = BankContainer::from_schema(fmt.clone());
    let mut rows = EventRows::new();

    assert!(src.read_event(&mut rows).unwrap());
    particles.fill_from_event(&rows).unwrap();
    tracks.fill_from_event(&rows).unwrap();
    fmt_tracks.fill_from_event(&rows).unwrap();
    assert_eq!(particles.n_rows(), 2);
    assert_eq!(particles.get_int("pid", 1).unwrap(), 211);
    assert_eq!(particles.get_int("status", 0).unwrap(), -2010);
    assert_relative_eq!(particles.get_double("pz", 0).unwrap(), 5.5);
    assert_eq!(tracks.n_rows(), 1);
    assert_relative_eq!(tracks.get_double("chi2", 0).unwrap(), 12.0);
    assert!(fmt_tracks.is_empty());

    assert!(src.read_event(&mut rows).unwrap());
    particles.fill_from_event(&rows).unwrap();
    tracks.fill_from_event(&rows).unwrap();
    assert_eq!(particles.n_rows(), 1);
    assert_eq!(particles.get_int("pid", 0).unwrap(), 2212);
    assert!(tracks.is_empty());

    assert!(!src.read_event(&mut rows).unwrap());
    std::fs::remove_file(&path).ok();
}

#[test]
fn small_batches_stream_every_event() {
    let reg = BankRegistry::clas12();
    let part = reg.get(REC_PARTICLE).unwrap();
    let events: Vec<EventRows> = (0..7)
        .map(|i| {
            EventRows::new()
                .with_bank(REC_PARTICLE, bank_rows(&part, &[&[("pid", f64::from(i))]]).unwrap())
        })
        .collect();

    let path = tmp_path("batches");
    write_event_parquet(&path, &[&*part], &events).unwrap();

    let mut src = ParquetEventSource::open_with_batch_size(&path, 3).unwrap();
    let mut container = BankContainer::from_schema(part);
    let mut rows = EventRows::new();
    let mut pids = Vec::new();
    while src.read_event(&mut rows).unwrap() {
        container.fill_from_event(&rows).unwrap();
        pids.push(container.get_int("pid", 0).unwrap());
    }
    assert_eq!(pids, (0..7).collect::<Vec<_>>());
    std::fs::remove_file(&path).ok();
}
