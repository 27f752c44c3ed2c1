// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the calendar feed over HTTP using wiremock.

use chrono::{NaiveDate, TimeDelta};
use lampy::schedule::{CalendarSource, HttpCalendar, ManualClock};
use lampy::{Error, ParseError, ProtocolError, Schedule, ScheduleOptions};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Example Council//Bin Collections//EN\r\n\
BEGIN:VEVENT\r\n\
UID:1@example\r\n\
DTSTART;VALUE=DATE:20240122\r\n\
SUMMARY:General Waste\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:2@example\r\n\
DTSTART;VALUE=DATE:20240116\r\n\
SUMMARY:Black Bin Collection\r\n\
DESCRIPTION:Cardboard\\, paper and cans\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:3@example\r\n\
SUMMARY:Council newsletter\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

async fn serve(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/bins.ics"))
        .respond_with(response)
        .mount(server)
        .await;
}

fn source(server: &MockServer) -> HttpCalendar {
    HttpCalendar::new(&format!("{}/bins.ics", server.uri())).unwrap()
}

#[tokio::test]
async fn downloads_document() {
    let server = MockServer::start().await;
    serve(&server, ResponseTemplate::new(200).set_body_string(FEED)).await;

    let document = source(&server).fetch().await.unwrap();
    assert_eq!(document, FEED);
}

#[tokio::test]
async fn reports_http_errors() {
    let server = MockServer::start().await;
    serve(&server, ResponseTemplate::new(404)).await;

    assert!(matches!(
        source(&server).fetch().await,
        Err(Error::Protocol(ProtocolError::Status { status: 404, .. }))
    ));
}

#[tokio::test]
async fn schedule_reads_upcoming_events_from_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bins.ics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .expect(1)
        .mount(&server)
        .await;

    let clock = ManualClock::new(date(15).and_hms_opt(18, 30, 0).unwrap());
    let schedule = Schedule::with_clock(source(&server), clock, ScheduleOptions::default());

    let all = schedule.events().await.unwrap();
    assert_eq!(all.len(), 2);

    let upcoming = schedule.upcoming(TimeDelta::days(7)).await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].start(), date(16));
    assert_eq!(upcoming[0].summary(), Some("Black Bin Collection"));
    assert_eq!(upcoming[0].description(), Some("Cardboard, paper and cans"));

    schedule.clock().advance(TimeDelta::days(2));
    let upcoming = schedule.upcoming(TimeDelta::days(7)).await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].start(), date(22));
}

#[tokio::test]
async fn schedule_surfaces_unparseable_feed() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_string("<html>Service unavailable</html>"),
    )
    .await;

    let clock = ManualClock::new(date(15).and_hms_opt(9, 0, 0).unwrap());
    let schedule = Schedule::with_clock(source(&server), clock, ScheduleOptions::default());

    assert!(matches!(
        schedule.upcoming(TimeDelta::days(7)).await,
        Err(Error::Parse(ParseError::UnexpectedFormat(_)))
    ));
    assert_eq!(schedule.last_fetch(), None);
}
