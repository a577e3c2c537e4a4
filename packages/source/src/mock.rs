//! Fixed sample incidents served when no `DataMall` account key is
//! configured.

use sentinel_ops_incident_models::Incident;

/// Returns the deterministic mock snapshot.
///
/// Spans three categories so downstream logging and category breakdowns
/// have something to show during local runs.
#[must_use]
pub fn mock_incidents() -> Vec<Incident> {
    vec![
        Incident::new(
            "Accident",
            1.3521,
            103.8198,
            "(19/1) 10:30 Accident on PIE (towards Changi Airport) after Adam Rd Exit. Avoid lane 1.",
        ),
        Incident::new(
            "Vehicle Breakdown",
            1.290_27,
            103.851_959,
            "(19/1) 10:45 Vehicle breakdown on ECP (towards City) at Benjamin Sheares Bridge. Expect delays.",
        ),
        Incident::new(
            "Roadworks",
            1.32,
            103.891,
            "(19/1) 11:00 Roadworks on KPE (towards TPE) after Defu Lane Exit. 2 lanes closed.",
        ),
    ]
}
