use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::models::{AlertLevel, Hostel, RecognizedStudent, SecurityAlert};

/// Face-presence signal polled once per recognition tick.
pub trait Detector: Send {
    fn faces_present(&mut self) -> anyhow::Result<bool>;
}

/// Random draws used to synthesize a recognized student.
pub trait IdentitySource: Send {
    fn student_id(&mut self) -> u32;
    fn name_suffix(&mut self) -> u32;
    /// Zero-based index into a hostel list of `count` entries (`count > 0`).
    fn hostel_index(&mut self, count: usize) -> usize;
}

/// Outcome of one detector reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    NoFace,
    NoHostels,
    Duplicate(String),
    Admitted(RecognizedStudent),
}

pub struct OccupancyRecognizer {
    hostels: Vec<Hostel>,
    alerts: Vec<SecurityAlert>,
    students: Vec<RecognizedStudent>,
    max_occupancy: u8,
    crowded_threshold: u8,
}

impl OccupancyRecognizer {
    pub fn new(hostels: Vec<Hostel>, alerts: Vec<SecurityAlert>) -> Self {
        Self {
            hostels,
            alerts,
            students: Vec::new(),
            max_occupancy: 100,
            crowded_threshold: 75,
        }
    }

    pub fn with_limits(mut self, max_occupancy: u8, crowded_threshold: u8) -> Self {
        self.max_occupancy = max_occupancy.min(100);
        self.crowded_threshold = crowded_threshold.min(self.max_occupancy);
        self
    }

    /// Handles one detector reading.
    pub fn observe(&mut self, detected: bool, identities: &mut dyn IdentitySource) -> Recognition {
        if !detected {
            return Recognition::NoFace;
        }
        if self.hostels.is_empty() {
            return Recognition::NoHostels;
        }

        let id = identities.student_id();
        let name = format!("Student {}", identities.name_suffix());
        let index = identities.hostel_index(self.hostels.len()).min(self.hostels.len() - 1);
        let hostel = &mut self.hostels[index];

        if self.students.iter().any(|student| student.name == name) {
            debug!("{} already recognized", name);
            return Recognition::Duplicate(name);
        }

        if hostel.occupancy < self.max_occupancy {
            hostel.occupancy += 1;
        }
        let student = RecognizedStudent {
            id,
            name,
            hostel_id: hostel.id,
            recognized: true,
        };
        info!(
            "recognized {} in {} (occupancy {}%)",
            student.name, hostel.name, hostel.occupancy
        );
        self.students.insert(0, student.clone());
        Recognition::Admitted(student)
    }

    pub fn mark_alert_as_read(&mut self, alert_id: u64) -> bool {
        match self.alerts.iter_mut().find(|alert| alert.id == alert_id) {
            Some(alert) => {
                alert.read = true;
                true
            }
            None => false,
        }
    }

    pub fn hostels(&self) -> &[Hostel] {
        &self.hostels
    }

    pub fn alerts(&self) -> &[SecurityAlert] {
        &self.alerts
    }

    /// Most recent first.
    pub fn students(&self) -> &[RecognizedStudent] {
        &self.students
    }

    pub fn students_in(&self, hostel_id: u64) -> impl Iterator<Item = &RecognizedStudent> {
        self.students
            .iter()
            .filter(move |student| student.hostel_id == hostel_id)
    }

    pub fn is_crowded(&self, hostel: &Hostel) -> bool {
        hostel.occupancy >= self.crowded_threshold
    }

    pub fn unread_alerts(&self) -> usize {
        self.alerts.iter().filter(|alert| !alert.read).count()
    }
}

pub fn default_hostels() -> Vec<Hostel> {
    vec![
        hostel(1, "Boys Hostel A", 80, &["WiFi", "Canteen", "Gym"]),
        hostel(2, "Girls Hostel B", 50, &["WiFi", "Laundry"]),
        hostel(3, "Boys Hostel C", 30, &["WiFi", "Gym"]),
    ]
}

pub fn default_alerts() -> Vec<SecurityAlert> {
    vec![
        SecurityAlert {
            id: 1,
            title: "Fire Drill".to_string(),
            description: "Scheduled at 5 PM today".to_string(),
            level: AlertLevel::Medium,
            read: false,
        },
        SecurityAlert {
            id: 2,
            title: "Suspicious Activity".to_string(),
            description: "Near Sports Complex".to_string(),
            level: AlertLevel::High,
            read: false,
        },
    ]
}

fn hostel(id: u64, name: &str, occupancy: u8, facilities: &[&str]) -> Hostel {
    Hostel {
        id,
        name: name.to_string(),
        occupancy,
        facilities: facilities.iter().map(|f| f.to_string()).collect(),
    }
}

/// Polls `detector` every `period` and feeds the reading into the recognizer.
/// The first tick fires after one full period. Stop the loop by aborting
/// the returned handle; with `max_ticks` set it also ends on its own.
pub fn spawn_recognition_loop(
    recognizer: Arc<RwLock<OccupancyRecognizer>>,
    mut detector: Box<dyn Detector>,
    mut identities: Box<dyn IdentitySource>,
    period: Duration,
    max_ticks: Option<u64>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        while max_ticks.map_or(true, |max| ticks < max) {
            ticker.tick().await;
            ticks += 1;

            let detected = match detector.faces_present() {
                Ok(detected) => detected,
                Err(err) => {
                    warn!("detector failed on tick {}: {:#}", ticks, err);
                    continue;
                }
            };
            let outcome = recognizer
                .write()
                .await
                .observe(detected, identities.as_mut());
            debug!("tick {}: {:?}", ticks, outcome);
        }

        ticks
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedIdentities {
        suffixes: VecDeque<u32>,
        hostels: VecDeque<usize>,
    }

    impl ScriptedIdentities {
        fn new(draws: &[(u32, usize)]) -> Self {
            Self {
                suffixes: draws.iter().map(|(suffix, _)| *suffix).collect(),
                hostels: draws.iter().map(|(_, hostel)| *hostel).collect(),
            }
        }
    }

    impl IdentitySource for ScriptedIdentities {
        fn student_id(&mut self) -> u32 {
            7
        }

        fn name_suffix(&mut self) -> u32 {
            self.suffixes.pop_front().unwrap_or(0)
        }

        fn hostel_index(&mut self, _count: usize) -> usize {
            self.hostels.pop_front().unwrap_or(0)
        }
    }

    struct ScriptedDetector(VecDeque<anyhow::Result<bool>>);

    impl Detector for ScriptedDetector {
        fn faces_present(&mut self) -> anyhow::Result<bool> {
            self.0.pop_front().unwrap_or(Ok(false))
        }
    }

    fn recognizer() -> OccupancyRecognizer {
        OccupancyRecognizer::new(default_hostels(), default_alerts())
    }

    #[test]
    fn no_face_changes_nothing() {
        let mut recognizer = recognizer();
        let mut identities = ScriptedIdentities::new(&[(5, 0)]);
        assert_eq!(recognizer.observe(false, &mut identities), Recognition::NoFace);
        assert!(recognizer.students().is_empty());
        assert_eq!(recognizer.hostels()[0].occupancy, 80);
    }

    #[test]
    fn new_student_is_prepended_and_counted() {
        let mut recognizer = recognizer();
        let mut identities = ScriptedIdentities::new(&[(5, 1), (9, 2)]);
        recognizer.observe(true, &mut identities);
        let outcome = recognizer.observe(true, &mut identities);

        match outcome {
            Recognition::Admitted(student) => {
                assert_eq!(student.name, "Student 9");
                assert_eq!(student.hostel_id, 3);
                assert!(student.recognized);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(recognizer.students()[0].name, "Student 9");
        assert_eq!(recognizer.students()[1].name, "Student 5");
        assert_eq!(recognizer.hostels()[1].occupancy, 51);
        assert_eq!(recognizer.hostels()[2].occupancy, 31);
        assert_eq!(recognizer.students_in(2).count(), 1);
    }

    #[test]
    fn duplicate_name_is_not_counted_twice() {
        let mut recognizer = recognizer();
        let mut identities = ScriptedIdentities::new(&[(5, 1), (5, 1), (5, 2)]);
        recognizer.observe(true, &mut identities);
        assert_eq!(
            recognizer.observe(true, &mut identities),
            Recognition::Duplicate("Student 5".to_string())
        );
        recognizer.observe(true, &mut identities);

        assert_eq!(recognizer.students().len(), 1);
        assert_eq!(recognizer.hostels()[1].occupancy, 51);
        assert_eq!(recognizer.hostels()[2].occupancy, 30);
    }

    #[test]
    fn occupancy_is_capped() {
        let mut recognizer = recognizer();
        let draws: Vec<(u32, usize)> = (0..40).map(|suffix| (suffix, 0)).collect();
        let mut identities = ScriptedIdentities::new(&draws);
        for _ in 0..40 {
            recognizer.observe(true, &mut identities);
        }
        assert_eq!(recognizer.students().len(), 40);
        assert_eq!(recognizer.hostels()[0].occupancy, 100);
        assert!(recognizer.is_crowded(&recognizer.hostels()[0]));
    }

    #[test]
    fn out_of_range_hostel_index_falls_on_last_hostel() {
        let mut recognizer = recognizer();
        let mut identities = ScriptedIdentities::new(&[(1, 17)]);
        recognizer.observe(true, &mut identities);
        assert_eq!(recognizer.students()[0].hostel_id, 3);
    }

    #[test]
    fn empty_hostel_set_admits_nobody() {
        let mut recognizer = OccupancyRecognizer::new(Vec::new(), Vec::new());
        let mut identities = ScriptedIdentities::default();
        assert_eq!(recognizer.observe(true, &mut identities), Recognition::NoHostels);
        assert!(recognizer.students().is_empty());
    }

    #[test]
    fn custom_limits_apply() {
        let mut recognizer = recognizer().with_limits(81, 50);
        let mut identities = ScriptedIdentities::new(&[(1, 0), (2, 0), (3, 2)]);
        for _ in 0..3 {
            recognizer.observe(true, &mut identities);
        }
        assert_eq!(recognizer.hostels()[0].occupancy, 81);
        assert!(recognizer.is_crowded(&recognizer.hostels()[1]));
        assert!(!recognizer.is_crowded(&recognizer.hostels()[2]));
    }

    #[test]
    fn seed_occupancy_above_cap_is_never_lowered() {
        let mut recognizer = recognizer().with_limits(60, 50);
        let mut identities = ScriptedIdentities::new(&[(1, 0), (2, 2)]);
        recognizer.observe(true, &mut identities);
        recognizer.observe(true, &mut identities);

        assert_eq!(recognizer.students().len(), 2);
        assert_eq!(recognizer.hostels()[0].occupancy, 80);
        assert_eq!(recognizer.hostels()[2].occupancy, 31);
    }

    #[test]
    fn crowded_threshold_is_bounded_by_cap() {
        let recognizer = recognizer().with_limits(40, 200);
        assert!(!recognizer.is_crowded(&recognizer.hostels()[2]));
        assert!(recognizer.is_crowded(&recognizer.hostels()[1]));
        assert!(recognizer.is_crowded(&recognizer.hostels()[0]));
    }

    #[test]
    fn marking_alerts_read() {
        let mut recognizer = recognizer();
        let before = recognizer.alerts().to_vec();
        assert!(!recognizer.mark_alert_as_read(42));
        assert_eq!(recognizer.alerts(), before.as_slice());

        assert!(recognizer.mark_alert_as_read(2));
        let once = recognizer.alerts().to_vec();
        recognizer.mark_alert_as_read(2);
        assert_eq!(recognizer.alerts(), once.as_slice());
        assert!(!once[0].read);
        assert!(once[1].read);
        assert_eq!(recognizer.unread_alerts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_polls_on_interval_and_skips_failures() {
        let shared = Arc::new(RwLock::new(recognizer()));
        let detector = ScriptedDetector(VecDeque::from(vec![
            Ok(true),
            Err(anyhow::anyhow!("camera permission denied")),
            Ok(false),
            Ok(true),
        ]));
        let identities = ScriptedIdentities::new(&[(1, 0), (2, 1)]);
        let period = Duration::from_millis(3000);

        let handle = spawn_recognition_loop(
            Arc::clone(&shared),
            Box::new(detector),
            Box::new(identities),
            period,
            Some(4),
        );

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(shared.read().await.students().is_empty());

        assert_eq!(handle.await.unwrap(), 4);
        let guard = shared.read().await;
        let names: Vec<&str> = guard.students().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Student 2", "Student 1"]);
        assert_eq!(guard.hostels()[0].occupancy, 81);
        assert_eq!(guard.hostels()[1].occupancy, 51);
    }

    #[tokio::test(start_paused = true)]
    async fn aborting_the_loop_stops_recognition() {
        let shared = Arc::new(RwLock::new(recognizer()));
        let detector = ScriptedDetector(std::iter::repeat_with(|| Ok(true)).take(10).collect());
        let identities = ScriptedIdentities::new(&(0..10u32).map(|n| (n, 0usize)).collect::<Vec<_>>());

        let handle = spawn_recognition_loop(
            Arc::clone(&shared),
            Box::new(detector),
            Box::new(identities),
            Duration::from_millis(3000),
            None,
        );
        tokio::time::sleep(Duration::from_millis(6500)).await;
        handle.abort();
        tokio::time::sleep(Duration::from_millis(30_000)).await;

        assert_eq!(shared.read().await.students().len(), 2);
    }
}
