// Properties every generated cantus firmus must have, across keys, clefs,
// lengths and seeds.

use species_counterpoint::analysis::Analyzer;
use species_counterpoint::cantus::{Clef, MAX_ATTEMPTS, generate_cantus_firmus, validator};
use species_counterpoint::config::GeneratorConfig;
use species_counterpoint::error::GenerationError;
use species_counterpoint::key::Key;
use species_counterpoint::note::Note;
use species_counterpoint::pitch::Pitch;
use species_counterpoint::rules::{RuleCatalog, RuleContext};
use species_counterpoint::species::Species;
use species_prng::{ScriptedSource, SeededRng};

fn assert_well_formed(melody: &[Note], config: &GeneratorConfig) {
    let label = format!("{} {} {}", config.key, config.clef, config.length);
    assert_eq!(melody.len(), config.length, "{label}");

    let tonic = config.key.tonic_pitch(config.clef.tonic_octave());
    assert_eq!(melody[0].pitch, tonic, "{label}");
    assert_eq!(melody[melody.len() - 1].pitch, tonic, "{label}");

    let high = melody.iter().map(|n| n.midi).max().unwrap();
    let peaks: Vec<usize> = (0..melody.len()).filter(|&i| melody[i].midi == high).collect();
    assert_eq!(peaks.len(), 1, "{label}");
    assert!(peaks[0] > 0 && peaks[0] < melody.len() - 1, "{label}");

    for pair in melody.windows(2) {
        let step = (pair[1].midi - pair[0].midi).abs();
        assert!(step != 0 && step != 6 && step <= 7, "{label}: {} -> {}", pair[0], pair[1]);
    }
    // Every leap of a fourth or more steps back, the final tonic included.
    for w in melody.windows(3) {
        let (leap, next) = (w[1].midi - w[0].midi, w[2].midi - w[1].midi);
        if leap.abs() >= 5 {
            assert!(next.abs() <= 2 && next.signum() == -leap.signum(), "{label}: {} {} {}", w[0], w[1], w[2]);
        }
    }
    assert!(melody.iter().all(|n| (n.midi - tonic.midi()).abs() <= 12), "{label}");
    assert!(validator::is_valid(melody, &config.key), "{label}");
}

#[test]
fn generated_melodies_are_well_formed() {
    let keys = ["C", "G", "F", "Bb", "D minor", "A minor", "F#m"];
    let clefs = [Clef::Treble, Clef::Alto, Clef::Tenor, Clef::Bass];
    for (k, key) in keys.iter().enumerate() {
        for (c, clef) in clefs.iter().enumerate() {
            for length in [4, 7, 11, 16] {
                let config = GeneratorConfig {
                    key: key.parse().unwrap(),
                    length,
                    clef: *clef,
                };
                let seed = (k * 100 + c * 10 + length) as u64;
                let melody = generate_cantus_firmus(&config, &mut SeededRng::new(seed)).unwrap();
                assert_well_formed(&melody, &config);
            }
        }
    }
}

#[test]
fn seed_reproduces_melody() {
    let config = GeneratorConfig {
        key: "E minor".parse().unwrap(),
        length: 12,
        clef: Clef::Alto,
    };
    let a = generate_cantus_firmus(&config, &mut SeededRng::new(2024)).unwrap();
    let b = generate_cantus_firmus(&config, &mut SeededRng::new(2024)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn generated_cantus_passes_cantus_frame_rule() {
    let key = Key::c_major();
    let config = GeneratorConfig {
        key,
        length: 10,
        clef: Clef::Bass,
    };
    let cf = generate_cantus_firmus(&config, &mut SeededRng::new(5)).unwrap();
    let cp: Vec<Note> = cf
        .iter()
        .map(|n| Note::whole(Pitch::from_midi(n.midi + 12).unwrap(), n.measure, &key))
        .collect();
    let ctx = RuleContext::new(Species::First, key, cf, cp);
    let catalog = RuleCatalog::standard();
    let result = Analyzer::new(&catalog).analyze(&ctx);
    assert_eq!(result.by_rule("cantus-tonic-frame").count(), 0);
}

#[test]
fn exhausted_search_is_fatal() {
    let config = GeneratorConfig {
        key: Key::c_major(),
        length: 4,
        clef: Clef::Bass,
    };
    let mut rng = ScriptedSource::constant(0.0);
    assert_eq!(
        generate_cantus_firmus(&config, &mut rng),
        Err(GenerationError::GenerationFailed { attempts: MAX_ATTEMPTS })
    );
}

#[test]
fn out_of_range_length_rejected() {
    for length in [3, 17] {
        let config = GeneratorConfig {
            length,
            ..GeneratorConfig::default()
        };
        assert_eq!(
            generate_cantus_firmus(&config, &mut SeededRng::new(0)),
            Err(GenerationError::InvalidLength(length))
        );
    }
}
