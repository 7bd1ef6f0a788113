//! Rule-based public holiday calendar
//!
//! Holidays are described as rules (fixed date, offset from Easter Sunday,
//! n-th weekday of a month, or a one-off function) with an optional year
//! restriction. Observed-day substitutions are not modelled.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeMap;

use super::{Holiday, HolidayCalendar, HolidayError};

/// How a holiday's date is found in a given year
#[derive(Clone, Copy)]
enum DateRule {
    Fixed { month: u32, day: u32 },
    /// Days relative to Easter Sunday
    Easter(i64),
    /// `n`-th weekday of the month; negative counts from the end
    NthWeekday { month: u32, weekday: Weekday, n: i8 },
    Computed(fn(i32) -> Option<NaiveDate>),
}

#[derive(Clone, Copy)]
enum Years {
    Always,
    Since(i32),
    Only(&'static [i32]),
    Every { step: i32, from: i32 },
}

impl Years {
    fn contains(&self, year: i32) -> bool {
        match self {
            Years::Always => true,
            Years::Since(first) => year >= *first,
            Years::Only(list) => list.contains(&year),
            Years::Every { step, from } => year >= *from && (year - from) % step == 0,
        }
    }
}

#[derive(Clone, Copy)]
struct Rule {
    name: &'static str,
    date: DateRule,
    years: Years,
}

const fn fixed(name: &'static str, month: u32, day: u32) -> Rule {
    Rule {
        name,
        date: DateRule::Fixed { month, day },
        years: Years::Always,
    }
}

const fn easter(name: &'static str, offset: i64) -> Rule {
    Rule {
        name,
        date: DateRule::Easter(offset),
        years: Years::Always,
    }
}

const fn nth(name: &'static str, month: u32, weekday: Weekday, n: i8) -> Rule {
    Rule {
        name,
        date: DateRule::NthWeekday { month, weekday, n },
        years: Years::Always,
    }
}

const fn computed(name: &'static str, f: fn(i32) -> Option<NaiveDate>) -> Rule {
    Rule {
        name,
        date: DateRule::Computed(f),
        years: Years::Always,
    }
}

impl Rule {
    const fn years(mut self, years: Years) -> Self {
        self.years = years;
        self
    }

    fn date_in(&self, year: i32) -> Option<NaiveDate> {
        if !self.years.contains(year) {
            return None;
        }
        match self.date {
            DateRule::Fixed { month, day } => NaiveDate::from_ymd_opt(year, month, day),
            DateRule::Easter(offset) => Some(easter_sunday(year)? + Duration::days(offset)),
            DateRule::NthWeekday { month, weekday, n } => nth_weekday(year, month, weekday, n),
            DateRule::Computed(f) => f(year),
        }
    }
}

/// Easter Sunday in the Gregorian calendar (anonymous computus)
///
/// ```
/// use chrono::NaiveDate;
/// use landing_loader::holidays::calendar::easter_sunday;
///
/// assert_eq!(easter_sunday(2024), NaiveDate::from_ymd_opt(2024, 3, 31));
/// assert_eq!(easter_sunday(2025), NaiveDate::from_ymd_opt(2025, 4, 20));
/// ```
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: i8) -> Option<NaiveDate> {
    if n > 0 {
        return NaiveDate::from_weekday_of_month_opt(year, month, weekday, n as u8);
    }
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = first_of_next.pred_opt()?;
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    let last_match = last - Duration::days(back as i64);
    Some(last_match - Duration::weeks((-n - 1) as i64))
}

/// Wednesday before 23 November
fn repentance_day(year: i32) -> Option<NaiveDate> {
    let nov_22 = NaiveDate::from_ymd_opt(year, 11, 22)?;
    let back = (7 + nov_22.weekday().num_days_from_monday() - Weekday::Wed.num_days_from_monday()) % 7;
    Some(nov_22 - Duration::days(back as i64))
}

/// 27 April, moved to the 26th when it falls on a Sunday
fn kings_day(year: i32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, 4, 27)?;
    if date.weekday() == Weekday::Sun {
        date.pred_opt()
    } else {
        Some(date)
    }
}

const AT: &[Rule] = &[
    fixed("Neujahr", 1, 1),
    fixed("Heilige Drei Könige", 1, 6),
    easter("Ostermontag", 1),
    fixed("Staatsfeiertag", 5, 1),
    easter("Christi Himmelfahrt", 39),
    easter("Pfingstmontag", 50),
    easter("Fronleichnam", 60),
    fixed("Mariä Himmelfahrt", 8, 15),
    fixed("Nationalfeiertag", 10, 26),
    fixed("Allerheiligen", 11, 1),
    fixed("Mariä Empfängnis", 12, 8),
    fixed("Christtag", 12, 25),
    fixed("Stefanitag", 12, 26),
];

const CH: &[Rule] = &[
    fixed("Neujahrestag", 1, 1),
    easter("Auffahrt", 39),
    fixed("Nationalfeiertag", 8, 1),
    fixed("Weihnachten", 12, 25),
];

const DE: &[Rule] = &[
    fixed("Neujahr", 1, 1),
    easter("Karfreitag", -2),
    easter("Ostermontag", 1),
    fixed("Erster Mai", 5, 1),
    easter("Christi Himmelfahrt", 39),
    easter("Pfingstmontag", 50),
    fixed("Tag der Deutschen Einheit", 10, 3),
    fixed("Erster Weihnachtstag", 12, 25),
    fixed("Zweiter Weihnachtstag", 12, 26),
];

const DE_BB: &[Rule] = &[
    easter("Ostersonntag", 0),
    easter("Pfingstsonntag", 49),
    fixed("Reformationstag", 10, 31),
];

const DE_BE: &[Rule] = &[
    fixed("Internationaler Frauentag", 3, 8).years(Years::Since(2019)),
    fixed("Tag der Befreiung", 5, 8).years(Years::Only(&[2020, 2025])),
];

const DE_BW: &[Rule] = &[
    fixed("Heilige Drei Könige", 1, 6),
    easter("Fronleichnam", 60),
    fixed("Allerheiligen", 11, 1),
];

const DE_BY: &[Rule] = &[
    fixed("Heilige Drei Könige", 1, 6),
    easter("Fronleichnam", 60),
    fixed("Allerheiligen", 11, 1),
];

const DE_HE: &[Rule] = &[easter("Fronleichnam", 60)];

const DE_NW: &[Rule] = &[easter("Fronleichnam", 60), fixed("Allerheiligen", 11, 1)];

const DE_SN: &[Rule] = &[
    fixed("Reformationstag", 10, 31),
    computed("Buß- und Bettag", repentance_day),
];

const FR: &[Rule] = &[
    fixed("Jour de l'an", 1, 1),
    easter("Lundi de Pâques", 1),
    fixed("Fête du Travail", 5, 1),
    fixed("Fête de la Victoire", 5, 8),
    easter("Ascension", 39),
    easter("Lundi de Pentecôte", 50),
    fixed("Fête nationale", 7, 14),
    fixed("Assomption", 8, 15),
    fixed("Toussaint", 11, 1),
    fixed("Armistice", 11, 11),
    fixed("Noël", 12, 25),
];

const GB: &[Rule] = &[
    fixed("New Year's Day", 1, 1),
    easter("Good Friday", -2),
    easter("Easter Monday", 1),
    nth("May Day", 5, Weekday::Mon, 1),
    nth("Spring Bank Holiday", 5, Weekday::Mon, -1),
    fixed("Queen Elizabeth II's Platinum Jubilee", 6, 3).years(Years::Only(&[2022])),
    fixed("State Funeral of Queen Elizabeth II", 9, 19).years(Years::Only(&[2022])),
    fixed("Coronation of Charles III", 5, 8).years(Years::Only(&[2023])),
    nth("Late Summer Bank Holiday", 8, Weekday::Mon, -1),
    fixed("Christmas Day", 12, 25),
    fixed("Boxing Day", 12, 26),
];

const NL: &[Rule] = &[
    fixed("Nieuwjaarsdag", 1, 1),
    easter("Eerste paasdag", 0),
    easter("Tweede paasdag", 1),
    computed("Koningsdag", kings_day),
    fixed("Bevrijdingsdag", 5, 5).years(Years::Every { step: 5, from: 1990 }),
    easter("Hemelvaartsdag", 39),
    easter("Eerste Pinksterdag", 49),
    easter("Tweede Pinksterdag", 50),
    fixed("Eerste Kerstdag", 12, 25),
    fixed("Tweede Kerstdag", 12, 26),
];

const US: &[Rule] = &[
    fixed("New Year's Day", 1, 1),
    nth("Martin Luther King Jr. Day", 1, Weekday::Mon, 3),
    nth("Washington's Birthday", 2, Weekday::Mon, 3),
    nth("Memorial Day", 5, Weekday::Mon, -1),
    fixed("Juneteenth National Independence Day", 6, 19).years(Years::Since(2021)),
    fixed("Independence Day", 7, 4),
    nth("Labor Day", 9, Weekday::Mon, 1),
    nth("Columbus Day", 10, Weekday::Mon, 2),
    fixed("Veterans Day", 11, 11),
    nth("Thanksgiving", 11, Weekday::Thu, 4),
    fixed("Christmas Day", 12, 25),
];

struct Country {
    code: &'static str,
    national: &'static [Rule],
    subdivisions: &'static [(&'static str, &'static [Rule])],
}

const COUNTRIES: &[Country] = &[
    Country {
        code: "AT",
        national: AT,
        subdivisions: &[],
    },
    Country {
        code: "CH",
        national: CH,
        subdivisions: &[],
    },
    Country {
        code: "DE",
        national: DE,
        subdivisions: &[
            ("BB", DE_BB),
            ("BE", DE_BE),
            ("BW", DE_BW),
            ("BY", DE_BY),
            ("HE", DE_HE),
            ("NW", DE_NW),
            ("SN", DE_SN),
        ],
    },
    Country {
        code: "FR",
        national: FR,
        subdivisions: &[],
    },
    Country {
        code: "GB",
        national: GB,
        subdivisions: &[],
    },
    Country {
        code: "NL",
        national: NL,
        subdivisions: &[],
    },
    Country {
        code: "US",
        national: US,
        subdivisions: &[],
    },
];

/// Calendar built from the rule tables in this module
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCalendar;

impl BuiltinCalendar {
    pub fn new() -> Self {
        Self
    }

    fn country(&self, code: &str) -> Result<&'static Country, HolidayError> {
        COUNTRIES
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| HolidayError::UnknownCountry(code.to_string()))
    }

    /// Subdivision codes known for a country
    pub fn subdivisions(&self, country: &str) -> Result<Vec<String>, HolidayError> {
        Ok(self
            .country(country)?
            .subdivisions
            .iter()
            .map(|(code, _)| code.to_string())
            .collect())
    }
}

impl HolidayCalendar for BuiltinCalendar {
    fn supported_countries(&self) -> Vec<String> {
        let mut codes: Vec<String> = COUNTRIES.iter().map(|c| c.code.to_string()).collect();
        codes.sort();
        codes
    }

    fn holidays(
        &self,
        country: &str,
        subdivision: Option<&str>,
        year: i32,
    ) -> Result<Vec<Holiday>, HolidayError> {
        let entry = self.country(country)?;
        let mut rules: Vec<&Rule> = entry.national.iter().collect();
        if let Some(sub) = subdivision {
            let (_, extra) = entry
                .subdivisions
                .iter()
                .find(|(code, _)| code.eq_ignore_ascii_case(sub))
                .ok_or_else(|| HolidayError::UnknownSubdivision {
                    country: entry.code.to_string(),
                    subdivision: sub.to_string(),
                })?;
            rules.extend(extra.iter());
        }

        // Two holidays on one date share a row, names joined
        let mut by_date: BTreeMap<NaiveDate, Vec<&str>> = BTreeMap::new();
        for rule in rules {
            if let Some(date) = rule.date_in(year) {
                let names = by_date.entry(date).or_default();
                if !names.contains(&rule.name) {
                    names.push(rule.name);
                }
            }
        }

        Ok(by_date
            .into_iter()
            .map(|(date, names)| Holiday {
                date,
                name: names.join("; "),
            })
            .collect())
    }
}
