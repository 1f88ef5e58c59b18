//! Tab-separated observable records.
//!
//! Three record streams are produced during a run: per-host utilization
//! snapshots, per-VM-request outcomes and per-chain summaries. The sink is
//! optional and never part of the core logic; write failures are reported by
//! the caller and do not affect the simulation.

use std::fs::File;
use std::path::Path;

use csv::WriterBuilder;

/// Sink for the observable record streams.
pub trait RecordSink {
    /// Per-host utilization snapshot.
    #[allow(clippy::too_many_arguments)]
    fn host_snapshot(
        &mut self,
        time: f64,
        host: &str,
        site: &str,
        free_ram: u64,
        free_cpu_units: u32,
        total_cpu_rate: f64,
        free_bandwidth: u64,
        free_storage: u64,
        vm_count: u32,
    ) -> csv::Result<()>;

    /// Per-VM-request outcome.
    fn vm_request(
        &mut self,
        time: f64,
        host: &str,
        vm: &str,
        site: &str,
        owner: &str,
        reason: &str,
        status: bool,
    ) -> csv::Result<()>;

    /// Per-chain summary.
    fn chain_summary(&mut self, time: f64, chain: &str, kind: &str, site_path: &str, hops: i64) -> csv::Result<()>;
}

/// Sink that drops all records.
#[derive(Default)]
pub struct NullSink;

impl NullSink {
    pub fn new() -> Self {
        Self {}
    }
}

impl RecordSink for NullSink {
    fn host_snapshot(
        &mut self,
        _time: f64,
        _host: &str,
        _site: &str,
        _free_ram: u64,
        _free_cpu_units: u32,
        _total_cpu_rate: f64,
        _free_bandwidth: u64,
        _free_storage: u64,
        _vm_count: u32,
    ) -> csv::Result<()> {
        Ok(())
    }

    fn vm_request(
        &mut self,
        _time: f64,
        _host: &str,
        _vm: &str,
        _site: &str,
        _owner: &str,
        _reason: &str,
        _status: bool,
    ) -> csv::Result<()> {
        Ok(())
    }

    fn chain_summary(&mut self, _time: f64, _chain: &str, _kind: &str, _site_path: &str, _hops: i64) -> csv::Result<()> {
        Ok(())
    }
}

/// Sink writing one tab-separated line per record, one file per stream.
pub struct TsvSink {
    servers: csv::Writer<File>,
    requests: csv::Writer<File>,
    chains: csv::Writer<File>,
}

impl TsvSink {
    /// Creates `servers.tsv`, `vm_requests.tsv` and `chains.tsv` in the
    /// specified directory.
    pub fn create(dir: &Path) -> std::io::Result<Self> {
        let open = |name: &str| -> std::io::Result<csv::Writer<File>> {
            let file = File::create(dir.join(name))?;
            Ok(WriterBuilder::new().delimiter(b'\t').from_writer(file))
        };
        Ok(Self {
            servers: open("servers.tsv")?,
            requests: open("vm_requests.tsv")?,
            chains: open("chains.tsv")?,
        })
    }
}

impl RecordSink for TsvSink {
    fn host_snapshot(
        &mut self,
        time: f64,
        host: &str,
        site: &str,
        free_ram: u64,
        free_cpu_units: u32,
        total_cpu_rate: f64,
        free_bandwidth: u64,
        free_storage: u64,
        vm_count: u32,
    ) -> csv::Result<()> {
        self.servers.write_record([
            format!("{:.3}", time).as_str(),
            host,
            site,
            &free_ram.to_string(),
            &free_cpu_units.to_string(),
            &format!("{:.1}", total_cpu_rate),
            &free_bandwidth.to_string(),
            &free_storage.to_string(),
            &vm_count.to_string(),
        ])?;
        self.servers.flush()?;
        Ok(())
    }

    fn vm_request(
        &mut self,
        time: f64,
        host: &str,
        vm: &str,
        site: &str,
        owner: &str,
        reason: &str,
        status: bool,
    ) -> csv::Result<()> {
        self.requests.write_record([
            format!("{:.3}", time).as_str(),
            host,
            vm,
            site,
            owner,
            reason,
            &status.to_string(),
        ])?;
        self.requests.flush()?;
        Ok(())
    }

    fn chain_summary(&mut self, time: f64, chain: &str, kind: &str, site_path: &str, hops: i64) -> csv::Result<()> {
        self.chains.write_record([
            format!("{:.3}", time).as_str(),
            chain,
            kind,
            site_path,
            &hops.to_string(),
        ])?;
        self.chains.flush()?;
        Ok(())
    }
}
