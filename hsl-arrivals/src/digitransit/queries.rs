//! GraphQL documents sent to the Digitransit routing API.

/// Stops whose name matches `$name`. The backend match is case-sensitive.
pub const STOPS_BY_NAME: &str = r#"query StopsByName($name: String!) {
  stops(name: $name) {
    gtfsId
    name
    code
  }
}"#;

/// Identity of stops by GTFS id.
pub const STOPS_BY_ID: &str = r#"query StopsById($ids: [String]) {
  stops(ids: $ids) {
    gtfsId
    name
    code
  }
}"#;

/// Stops by GTFS id with their routes and pattern headsigns.
pub const STOP_DETAIL: &str = r#"query StopDetail($ids: [String]) {
  stops(ids: $ids) {
    gtfsId
    name
    code
    routes {
      shortName
      patterns {
        headsign
      }
    }
  }
}"#;

/// Next departures from a stop with real-time estimates.
pub const STOP_DEPARTURES: &str = r#"query StopDepartures($id: String!, $count: Int!) {
  stop(id: $id) {
    gtfsId
    name
    code
    stoptimesWithoutPatterns(numberOfDepartures: $count, omitNonPickups: true) {
      serviceDay
      scheduledArrival
      realtimeArrival
      realtime
      headsign
      trip {
        tripHeadsign
        route {
          shortName
        }
      }
    }
  }
}"#;
