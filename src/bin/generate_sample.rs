use std::f64::consts::PI;

/// Seeded noise source so every generated flight file is byte-identical.
/// xoshiro256** seeded through splitmix64.
struct NoiseRng([u64; 4]);

impl NoiseRng {
    fn seeded(seed: u64) -> Self {
        let mut x = seed;
        let mut splitmix = || {
            x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = x;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^ (z >> 31)
        };
        NoiseRng([splitmix(), splitmix(), splitmix(), splitmix()])
    }

    fn next_u64(&mut self) -> u64 {
        let s = &mut self.0;
        let out = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = s[1] << 17;
        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(45);
        out
    }

    /// Uniform in `(0, 1]`.
    fn unit(&mut self) -> f64 {
        ((self.next_u64() >> 11) + 1) as f64 / (1u64 << 53) as f64
    }

    /// Zero-mean sensor noise (Box-Muller).
    fn noise(&mut self, std_dev: f64) -> f64 {
        let radius = (-2.0 * self.unit().ln()).sqrt();
        std_dev * radius * (2.0 * PI * self.unit()).cos()
    }
}

const SAMPLE_RATE_HZ: f64 = 10.0;
const DURATION_S: f64 = 600.0;
const START_DAY: u64 = 198;
const START_SECONDS: f64 = 9.0 * 3600.0 + 40.0 * 60.0;

/// `DOY:HH:MM:SS.ffffff` for a time offset from the start of the flight.
fn day_of_year_token(offset_s: f64) -> String {
    let micros = ((START_SECONDS + offset_s) * 1e6).round() as u64;
    let secs = micros / 1_000_000;
    format!(
        "{:03}:{:02}:{:02}:{:02}.{:06}",
        START_DAY + secs / 86_400,
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60,
        micros % 1_000_000
    )
}

fn main() -> anyhow::Result<()> {
    let mut rng = NoiseRng::seeded(42);
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_flight.tsv".to_string());

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&output_path)?;

    writer.write_record([
        "Description", "ALT", "Altitude Rate", "CAS", "TAS", "TAT", "Baro Press", "MACH", "Nz",
    ])?;
    writer.write_record(["EU", "ft", "ft/min", "kt", "kt", "degC", "hPa", "EU", "g"])?;

    let rows = (DURATION_S * SAMPLE_RATE_HZ) as usize;
    let mut altitude = 1200.0;
    for i in 0..rows {
        let t = i as f64 / SAMPLE_RATE_HZ;

        // Climb for the first half, descend for the second.
        let climb_fpm = if t < DURATION_S / 2.0 { 1500.0 } else { -1200.0 };
        altitude += climb_fpm / 60.0 / SAMPLE_RATE_HZ;

        let cas = 180.0 + 20.0 * (2.0 * PI * t / DURATION_S).sin() + rng.noise(0.5);
        let tas = cas * (1.0 + altitude / 1000.0 * 0.02);
        let tat = 15.0 - altitude / 1000.0 * 1.98 + rng.noise(0.1);
        let press = 1013.25 * (1.0 - 6.8756e-6 * altitude).powf(5.2559);
        let mach = tas / 661.47;
        // 2.5 Hz airframe vibration on top of 1 g, with an occasional spike.
        let mut nz = 1.0 + 0.05 * (2.0 * PI * 2.5 * t).sin() + rng.noise(0.01);
        if i % 1700 == 850 {
            nz += 0.8;
        }

        let alt_cell = if i % 997 == 500 {
            // Dropout, as real exports have.
            "*****".to_string()
        } else {
            format!("{altitude:.0}")
        };

        writer.write_record([
            day_of_year_token(t),
            alt_cell,
            format!("{:.0}", climb_fpm + rng.noise(20.0)),
            format!("{cas:.1}"),
            format!("{tas:.1}"),
            format!("{tat:.2}"),
            format!("{press:.2}"),
            format!("{mach:.3}"),
            format!("{nz:.4}"),
        ])?;
    }
    writer.flush()?;

    println!(
        "Wrote {rows} rows ({} s at {SAMPLE_RATE_HZ} Hz) to {output_path}",
        DURATION_S
    );
    Ok(())
}
