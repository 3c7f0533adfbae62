//! Writes a small, deterministic set of monitoring exports plus a config
//! pointing at them, so the report can be built without the monitoring API.
//!
//! Usage: `generate_sample [DIR]` (default `reports`).

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use zbx_report::data::codec::{bytes_to_gb, encode_text, round2};
use zbx_report::data::loader::write_rows;

const HOSTS: usize = 12;
const DAY_S: i64 = 24 * 3600;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Minimal deterministic PRNG (64-bit LCG).
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

struct Host {
    id: String,
    name: String,
    ip: String,
    windows: bool,
}

fn header(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn num(v: f64) -> String {
    encode_text(&round2(v).to_string())
}

fn write_csv(path: &Path, columns: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_rows(file, &header(columns), rows, b';')?;
    println!("wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| "reports".into());
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut rng = Lcg(42);
    let hosts: Vec<Host> = (0..HOSTS)
        .map(|i| Host {
            id: (10_100 + i).to_string(),
            name: format!("srv-{i:02}"),
            ip: format!("10.0.{}.{}", i / 4, 10 + i),
            windows: i % 3 == 0,
        })
        .collect();

    // -- Trends (primary) --
    let trend_rows = hosts
        .iter()
        .map(|h| {
            let cpu = rng.range(5.0, 70.0);
            let ram = rng.range(20.0, 95.0);
            vec![
                h.id.clone(),
                h.name.clone(),
                h.name.to_uppercase(),
                h.ip.clone(),
                if h.windows { "Windows by Zabbix agent" } else { "Linux by Zabbix agent" }.to_string(),
                "7".to_string(),
                num(cpu),
                num((cpu * 1.4).min(100.0)),
                num(ram),
                num((ram * 1.1).min(100.0)),
            ]
        })
        .collect();
    write_csv(
        &dir.join("zbx_trends.csv"),
        &[
            "HostID", "Host", "VisibleName", "IP", "Templates", "Trend",
            "%_CPU_Util", "%_CPU_Util_MAX", "%_RAM_Util", "%_RAM_Util_MAX",
        ],
        trend_rows,
    )?;

    // -- Disk utilization --
    let mut disk_rows = Vec::new();
    for h in hosts.iter().skip(1) {
        let disks: &[&str] = if h.windows { &["0 C:", "1 D:", "1 E:"] } else { &["sda", "sdb"] };
        for d in disks {
            disk_rows.push(vec![h.id.clone(), h.name.clone(), d.to_string(), num(rng.range(0.5, 40.0))]);
        }
    }
    write_csv(&dir.join("zbx_disks.csv"), &["HostID", "Host", "Disk", "Util_Avg"], disk_rows)?;

    // -- Filesystems --
    let mut fs_rows = Vec::new();
    for h in hosts.iter().skip(2) {
        let mounts: &[&str] = if h.windows { &["C:", "D:"] } else { &["/", "/var", "/home"] };
        for m in mounts {
            let total = rng.range(20.0, 500.0).round() * GIB;
            let used = total * rng.range(0.1, 0.98);
            let free = total - used;
            fs_rows.push(vec![
                h.id.clone(),
                h.name.clone(),
                m.to_string(),
                "Size".to_string(),
                num(bytes_to_gb(total)),
                num(bytes_to_gb(used)),
                num(bytes_to_gb(free)),
                num(used / total * 100.0),
            ]);
        }
    }
    write_csv(
        &dir.join("zbx_disks_fs.csv"),
        &["HostID", "Host", "Filesystem", "Metric", "Total_GB", "Used_GB", "Free_GB", "UsedPercent"],
        fs_rows,
    )?;

    // -- CPU history, one day at 60s --
    let start: i64 = 1_700_000_000;
    let history: Vec<_> = hosts
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let samples: Vec<_> = if i == HOSTS - 1 {
                Vec::new()
            } else {
                let mut burst = 0;
                (0..DAY_S / 60)
                    .map(|k| {
                        if burst == 0 && rng.next_f64() < 0.004 {
                            burst = 1 + (rng.next_f64() * 8.0) as i32;
                        }
                        let value = if burst > 0 {
                            burst -= 1;
                            rng.range(80.0, 100.0)
                        } else {
                            rng.range(2.0, 60.0)
                        };
                        json!({ "clock": (start + k * 60).to_string(), "value": format!("{value:.4}") })
                    })
                    .collect()
            };
            json!({
                "hostid": h.id,
                "host": h.name,
                "name": h.name.to_uppercase(),
                "ip": h.ip,
                "has_item": i != HOSTS - 2,
                "history": samples,
            })
        })
        .collect();
    let history_path = dir.join("cpu_history.json");
    serde_json::to_writer(File::create(&history_path)?, &history)?;
    println!("wrote {}", history_path.display());

    // -- Config --
    let config = json!({
        "period_days": 7,
        "trends": dir.join("zbx_trends.csv"),
        "disks": dir.join("zbx_disks.csv"),
        "filesystems": dir.join("zbx_disks_fs.csv"),
        "cpu_spikes": dir.join("zbx_cpu_spikes.csv"),
        "cpu_history": history_path,
        "spikes_raw_output": dir.join("zbx_cpu_spikes_raw.csv"),
        "output": dir.join("merged_all_7d.csv"),
    });
    let config_path = dir.join("zbx-report.json");
    serde_json::to_writer_pretty(File::create(&config_path)?, &config)?;
    println!("wrote {}", config_path.display());

    Ok(())
}
