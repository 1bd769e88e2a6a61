//! Wall-clock marks for the phases of one probe attempt and the derived
//! microsecond durations.

use std::time::{Duration, Instant};

use crate::models::ProbeOutcome;

/// Instants captured while an attempt runs. A phase that never started keeps `None`.
#[derive(Debug, Clone)]
pub struct PhaseMarks {
    pub request_start: Instant,
    pub dns_start: Option<Instant>,
    pub dns_end: Option<Instant>,
    pub tls_start: Option<Instant>,
    pub tls_end: Option<Instant>,
    pub first_byte: Option<Instant>,
    pub completion: Option<Instant>,
}

impl PhaseMarks {
    pub fn start() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(request_start: Instant) -> Self {
        Self {
            request_start,
            dns_start: None,
            dns_end: None,
            tls_start: None,
            tls_end: None,
            first_byte: None,
            completion: None,
        }
    }

    pub fn mark_dns_start(&mut self) {
        self.dns_start = Some(Instant::now());
    }

    pub fn mark_dns_end(&mut self) {
        self.dns_end = Some(Instant::now());
    }

    pub fn mark_tls_start(&mut self) {
        self.tls_start = Some(Instant::now());
    }

    pub fn mark_tls_end(&mut self) {
        self.tls_end = Some(Instant::now());
    }

    pub fn mark_first_byte(&mut self) {
        self.first_byte = Some(Instant::now());
    }

    /// Record the end of the attempt unless the body already completed.
    pub fn mark_completion(&mut self) {
        if self.completion.is_none() {
            self.completion = Some(Instant::now());
        }
    }

    /// Close a DNS or TLS phase that started but was cut short by the deadline.
    pub fn close_open_phases(&mut self) {
        if self.dns_start.is_some() && self.dns_end.is_none() {
            self.mark_dns_end();
        }
        if self.tls_start.is_some() && self.tls_end.is_none() {
            self.mark_tls_end();
        }
    }

    pub fn dns_us(&self) -> i64 {
        span_us(self.dns_start, self.dns_end)
    }

    pub fn ssl_us(&self) -> i64 {
        span_us(self.tls_start, self.tls_end)
    }

    pub fn ttfb_us(&self) -> i64 {
        span_us(Some(self.request_start), self.first_byte)
    }

    pub fn ttlb_us(&self) -> i64 {
        span_us(Some(self.request_start), self.completion)
    }

    pub fn outcome(&self, serviceable: bool) -> ProbeOutcome {
        ProbeOutcome {
            serviceable,
            ttfb_us: self.ttfb_us(),
            ttlb_us: self.ttlb_us(),
            dns_us: self.dns_us(),
            ssl_us: self.ssl_us(),
        }
    }
}

fn span_us(start: Option<Instant>, end: Option<Instant>) -> i64 {
    match (start, end) {
        (Some(start), Some(end)) => micros(end.saturating_duration_since(start)),
        _ => 0,
    }
}

fn micros(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}
