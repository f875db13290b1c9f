//! Instrument and percussion names the renderer knows.
//!
//! A General MIDI subset. Names are matched exactly.

const INSTRUMENTS: &[&str] = &[
    // pianos and chromatic percussion
    "Piano",
    "BrightPiano",
    "ElectricPiano",
    "HonkyTonk",
    "Harpsichord",
    "Clavinet",
    "Celesta",
    "Glockenspiel",
    "MusicBox",
    "Vibraphone",
    "Marimba",
    "Xylophone",
    "TubularBells",
    // organs
    "Organ",
    "ChurchOrgan",
    "ReedOrgan",
    "Accordion",
    "Harmonica",
    // guitars and basses
    "AcousticGuitar",
    "SteelGuitar",
    "JazzGuitar",
    "CleanGuitar",
    "OverdrivenGuitar",
    "DistortionGuitar",
    "AcousticBass",
    "ElectricBass",
    "FretlessBass",
    "SlapBass",
    "SynthBass",
    // strings
    "Violin",
    "Viola",
    "Cello",
    "Contrabass",
    "TremoloStrings",
    "PizzicatoStrings",
    "Harp",
    "Timpani",
    "Strings",
    "SynthStrings",
    "Choir",
    "Voice",
    // brass and reeds
    "Trumpet",
    "Trombone",
    "Tuba",
    "FrenchHorn",
    "Brass",
    "SopranoSax",
    "AltoSax",
    "TenorSax",
    "BaritoneSax",
    "Oboe",
    "EnglishHorn",
    "Bassoon",
    "Clarinet",
    // pipes
    "Piccolo",
    "Flute",
    "Recorder",
    "PanFlute",
    "Whistle",
    "Ocarina",
    // synths and ethnic
    "SquareLead",
    "SawLead",
    "Pad",
    "Sitar",
    "Banjo",
    "Shamisen",
    "Koto",
    "Kalimba",
    "Bagpipe",
    "Fiddle",
];

const PERCUSSION: &[&str] = &[
    "Drums",
    "BassDrum",
    "SnareDrum",
    "HiHat",
    "Cymbal",
    "Tom",
    "Clap",
    "Cowbell",
    "Tambourine",
    "Conga",
    "Bongo",
    "Woodblock",
    "Triangle",
    "Shaker",
];

pub fn is_instrument(name: &str) -> bool {
    INSTRUMENTS.contains(&name)
}

pub fn is_percussion(name: &str) -> bool {
    PERCUSSION.contains(&name)
}
