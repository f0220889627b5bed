use jiff::SpanRelativeTo;
use waypoint_optimizer::{json::schema::RequestKind, solver::optimize::Algorithm};

pub fn parse_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    if let Ok(duration) = input.parse::<jiff::SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(jiff::SignedDuration::from_secs(seconds.abs()));
    }

    Err(String::from("Invalid duration"))
}

/// Accepts the JSON names (`GENETIC`) as well as `genetic` or `nn-2opt`.
pub fn parse_algorithm(input: &str) -> Result<Algorithm, String> {
    match input.to_ascii_lowercase().replace('-', "_").as_str() {
        "nearest_neighbor_2opt" | "nn_2opt" | "2opt" => Ok(Algorithm::NearestNeighborTwoOpt),
        "genetic" | "ga" => Ok(Algorithm::Genetic),
        "simulated_annealing" | "sa" => Ok(Algorithm::SimulatedAnnealing),
        _ => Err(format!("Unknown algorithm {input}")),
    }
}

pub fn parse_request_kind(input: &str) -> Result<RequestKind, String> {
    match input.to_ascii_lowercase().as_str() {
        "route" => Ok(RequestKind::Route),
        "batch" => Ok(RequestKind::Batch),
        "compare" => Ok(RequestKind::Compare),
        "scenario" => Ok(RequestKind::Scenario),
        "deviation" => Ok(RequestKind::Deviation),
        _ => Err(format!("Unknown request kind {input}")),
    }
}
