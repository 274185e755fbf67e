//! Scripted sessions for unit tests.

use std::sync::Arc;

use cool_cleartool::ScriptedRunner;

use crate::baseline::BASELINE_FORMAT;
use crate::component::COMPONENT_FORMAT;
use crate::navigator::CHILDREN_FORMAT;
use crate::project::PROJECT_FORMAT;
use crate::session::{Session, SessionSettings};
use crate::stream::{RECOMMENDED_FORMAT, STREAM_FORMAT};

pub(crate) const SCOPE: &str = "/vobs/pvob";

/// The command line the runner sees for a descriptor query.
pub(crate) fn describe_cmd(format: &str, target: &str) -> String {
    format!("describe -fmt {format} {target}")
}

fn qualified(kind: &str, name: &str) -> String {
    format!("{kind}:{name}@{SCOPE}")
}

pub(crate) struct Fixture {
    pub runner: Arc<ScriptedRunner>,
    pub session: Session,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    pub fn with_settings(configure: impl FnOnce(&mut SessionSettings)) -> Self {
        let mut settings = SessionSettings {
            default_scope: Some(SCOPE.to_owned()),
            ..SessionSettings::default()
        };
        configure(&mut settings);
        let runner = Arc::new(ScriptedRunner::new());
        let session = Session::with_settings(Arc::clone(&runner), settings);
        Self { runner, session }
    }

    pub fn project(&self, name: &str, istream: Option<&str>, master: &str) {
        let istream = istream.map(|s| qualified("stream", s)).unwrap_or_default();
        self.runner.respond(
            &describe_cmd(PROJECT_FORMAT, &qualified("project", name)),
            [format!("{name}}}{{{istream}}}{{{master}")],
        );
    }

    /// A writable stream without foundation baselines.
    pub fn stream(&self, name: &str, project: &str, target: Option<&str>, master: &str) {
        let target = target.map(|s| qualified("stream", s)).unwrap_or_default();
        let project = qualified("project", project);
        self.stream_line(name, &format!("{name}}}{{{project}}}{{{target}}}{{}}{{}}{{{master}"));
    }

    pub fn stream_line(&self, name: &str, line: &str) {
        self.runner
            .respond(&describe_cmd(STREAM_FORMAT, &qualified("stream", name)), [line]);
    }

    pub fn baseline(&self, name: &str, component: &str, stream: &str, level: &str, date: &str) {
        let component = qualified("component", component);
        let stream = qualified("stream", stream);
        self.runner.respond(
            &describe_cmd(BASELINE_FORMAT, &qualified("baseline", name)),
            [format!("{name}}}{{{component}}}{{{stream}}}{{{level}}}{{jdoe}}{{{date}}}{{}}{{site1")],
        );
    }

    pub fn component(&self, name: &str, root: &str, master: &str) {
        self.runner.respond(
            &describe_cmd(COMPONENT_FORMAT, &qualified("component", name)),
            [format!("{name}}}{{{root}}}{{{master}")],
        );
    }

    pub fn children(&self, stream: &str, children: &[&str]) {
        let list = children
            .iter()
            .map(|c| qualified("stream", c))
            .collect::<Vec<_>>()
            .join(", ");
        self.runner.respond(
            &describe_cmd(CHILDREN_FORMAT, &qualified("stream", stream)),
            [list],
        );
    }

    pub fn recommended(&self, stream: &str, baselines: &[&str]) {
        let list = baselines
            .iter()
            .map(|b| qualified("baseline", b))
            .collect::<Vec<_>>()
            .join(" ");
        self.runner.respond(
            &describe_cmd(RECOMMENDED_FORMAT, &qualified("stream", stream)),
            [list],
        );
    }

    pub fn deliver_idle(&self, stream: &str) {
        let target = qualified("stream", stream);
        self.runner.respond(
            &Self::deliver_cmd(stream),
            [format!("No deliver operation in progress on stream \"{target}\"")],
        );
    }

    /// A delivery from `stream` in progress, posted from `replica` if given.
    pub fn deliver_in_progress(&self, stream: &str, replica: Option<&str>, baselines: &[&str]) {
        let source = qualified("stream", stream);
        let mut lines = vec![format!("Deliver operation in progress on stream \"{source}\"")];
        if !baselines.is_empty() {
            lines.push("Baselines to be delivered:".to_owned());
            lines.extend(baselines.iter().map(|b| format!("\t{}", qualified("baseline", b))));
        }
        if let Some(replica) = replica {
            lines.push(format!("Operation posted from replica \"{replica}\""));
        }
        self.runner.respond(&Self::deliver_cmd(stream), lines);
    }

    pub fn deliver_text(&self, stream: &str, text: &str) {
        self.runner.respond(&Self::deliver_cmd(stream), [text]);
    }

    pub fn deliver_cmd(stream: &str) -> String {
        format!("deliver -status -stream {}", qualified("stream", stream))
    }
}
