use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hound::{SampleFormat, WavSpec, WavWriter};

/// Write synthetic <id>.wav / <id>.txt pairs: noise with tone bursts, each
/// burst listed as an annotation row.
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    #[arg(long, default_value = "dataset")]
    out_dir: PathBuf,
    #[arg(long, default_value_t = 6)]
    count: usize,
    #[arg(long, default_value_t = 16000)]
    sample_rate: u32,
    #[arg(long, default_value_t = 2.0)]
    seconds: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// Up to three non-overlapping bursts inside `[0, seconds)`.
fn random_bursts(rng: &mut SimpleRng, seconds: f64) -> Vec<(f64, f64)> {
    let slots = 3;
    let slot_len = seconds / slots as f64;
    let mut bursts = Vec::new();
    for slot in 0..slots {
        if rng.next_f64() >= 0.8 {
            continue;
        }
        let base = slot as f64 * slot_len;
        let start = base + rng.uniform(0.0, slot_len * 0.4);
        let end = start + rng.uniform(slot_len * 0.1, slot_len * 0.5);
        bursts.push((start, end));
    }
    bursts
}

fn synthesize(rng: &mut SimpleRng, bursts: &[(f64, f64)], sample_rate: u32, seconds: f64) -> Vec<f32> {
    let n = (seconds * sample_rate as f64).round() as usize;
    let freq = rng.uniform(200.0, 1200.0);
    (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let noise = rng.uniform(-0.02, 0.02);
            let tone = if bursts.iter().any(|&(s, e)| t >= s && t < e) {
                0.6 * (2.0 * std::f64::consts::PI * freq * t).sin()
            } else {
                0.0
            };
            (tone + noise) as f32
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let spec = WavSpec {
        channels: 1,
        sample_rate: args.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    for idx in 0..args.count {
        let id = format!("sample_{idx:03}");
        let bursts = random_bursts(&mut rng, args.seconds);
        let audio = synthesize(&mut rng, &bursts, args.sample_rate, args.seconds);

        let wav_path = args.out_dir.join(format!("{id}.wav"));
        let mut writer = WavWriter::create(&wav_path, spec)
            .with_context(|| format!("creating {}", wav_path.display()))?;
        for value in &audio {
            writer.write_sample((value.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)?;
        }
        writer.finalize()?;

        let mut marks = String::new();
        for (start, end) in &bursts {
            writeln!(marks, "{start:.6}\t{end:.6}")?;
        }
        let txt_path = args.out_dir.join(format!("{id}.txt"));
        std::fs::write(&txt_path, marks)
            .with_context(|| format!("writing {}", txt_path.display()))?;
    }

    println!(
        "Wrote {} pairs ({} Hz, {:.1}s each) to {}",
        args.count,
        args.sample_rate,
        args.seconds,
        args.out_dir.display()
    );
    Ok(())
}
