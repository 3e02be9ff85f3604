//! Line-oriented interactive front end over a [`FilterSession`].
//!
//! Each command maps onto one session operation: `open` presents the picker,
//! `filter` shows the menu or switches filters, the slider commands set one
//! parameter, `save` hands the output to the album. Save outcomes arrive
//! asynchronously and are printed before the next prompt.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::cli::pick_blocking;
use crate::error::SessionError;
use crate::filter::{FilterVariant, ParameterSlot};
use crate::library::PhotoLibrary;
use crate::ops::{CpuTransform, ImageTransform};
use crate::picker::FilePicker;
use crate::session::{FilterSession, RecomputeOutcome};

const HELP: &str = "\
commands:
  open <path>          pick a picture
  filter               show the filter menu
  filter <name|n>      switch filter (name, menu number, or cancel)
  intensity <v>        set the intensity slider (0-1)
  radius <v>           set the radius slider (0-500)
  scale <v>            set the scale slider (0-500)
  status               show the current filter, sliders and picture
  save                 save the filtered picture to the album
  help                 show this text
  quit                 wait for pending saves and exit";

pub struct Shell<L: PhotoLibrary, T: ImageTransform = CpuTransform> {
    session: FilterSession<T>,
    picker: FilePicker,
    library: L,
    save_tx: Sender<String>,
    save_rx: Receiver<String>,
    pending_saves: usize,
}

impl<L: PhotoLibrary, T: ImageTransform> Shell<L, T> {
    pub fn new(session: FilterSession<T>, picker: FilePicker, library: L) -> Self {
        let (save_tx, save_rx) = mpsc::channel();
        Self {
            session,
            picker,
            library,
            save_tx,
            save_rx,
            pending_saves: 0,
        }
    }

    pub fn session(&self) -> &FilterSession<T> {
        &self.session
    }

    /// Read commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        writeln!(out, "Instafilter. Type `help` for commands.")?;
        self.print_status(out)?;

        for line in input.lines() {
            let line = line?;
            self.drain_saves(out)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !self.execute(line, out)? {
                break;
            }
        }

        self.finish_saves(out)
    }

    /// Run one command. Returns `false` when the shell should exit.
    fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<bool> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command.to_lowercase().as_str() {
            "open" => self.open(rest, out)?,
            "filter" => self.filter(rest, out)?,
            "intensity" => self.slider(ParameterSlot::Intensity, rest, out)?,
            "radius" => self.slider(ParameterSlot::Radius, rest, out)?,
            "scale" => self.slider(ParameterSlot::Scale, rest, out)?,
            "status" => self.print_status(out)?,
            "save" => self.save(out)?,
            "help" | "?" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => return Ok(false),
            other => writeln!(out, "unknown command `{other}`; type `help`")?,
        }
        Ok(true)
    }

    fn open<W: Write>(&mut self, path: &str, out: &mut W) -> io::Result<()> {
        if path.is_empty() {
            return writeln!(out, "usage: open <path>");
        }
        self.picker.push(PathBuf::from(path));
        match self.session.handle_pick(pick_blocking(&mut self.picker)) {
            None => writeln!(out, "could not open {path}; picture unchanged"),
            Some(outcome) => {
                self.report(outcome, out)?;
                self.print_status(out)
            }
        }
    }

    fn filter<W: Write>(&mut self, choice: &str, out: &mut W) -> io::Result<()> {
        if choice.is_empty() {
            writeln!(out, "Choose filter:")?;
            for (i, variant) in FilterVariant::MENU.iter().enumerate() {
                writeln!(out, "  {}. {}", i + 1, variant.label())?;
            }
            return writeln!(out, "  {}. Cancel", FilterVariant::MENU.len() + 1);
        }

        let picked = match choice.parse::<usize>() {
            Ok(n) if (1..=FilterVariant::MENU.len()).contains(&n) => Some(FilterVariant::MENU[n - 1]),
            Ok(n) if n == FilterVariant::MENU.len() + 1 => None,
            _ if choice.eq_ignore_ascii_case("cancel") => None,
            _ => match choice.parse::<FilterVariant>() {
                Ok(variant) => Some(variant),
                Err(e) => return writeln!(out, "{e}"),
            },
        };

        match picked {
            Some(variant) => {
                let outcome = self.session.set_variant(variant);
                self.report(outcome, out)?;
                writeln!(out, "Change Filter: {}", self.session.label())
            }
            None => Ok(()),
        }
    }

    fn slider<W: Write>(&mut self, slot: ParameterSlot, value: &str, out: &mut W) -> io::Result<()> {
        let value = match value.parse::<f32>() {
            Ok(v) if v.is_finite() => slot.clamp_to_ui(v),
            _ => {
                let (lo, hi) = slot.ui_range();
                return writeln!(out, "usage: {slot} <number {lo}-{hi}>");
            }
        };

        let outcome = self.session.set_parameter(slot, value);
        if !self.session.variant().accepts(slot) {
            return writeln!(out, "{slot} = {value} ({} ignores it)", self.session.label());
        }
        self.report(outcome, out)?;
        writeln!(out, "{slot} = {value}")
    }

    fn save<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let tx = self.save_tx.clone();
        let result = self.session.request_save_with(&self.library, move |result| {
            let line = match result {
                Ok(saved) => format!("Success! Saved to {}", saved.path.display()),
                Err(e) => format!("Oops: {e}"),
            };
            let _ = tx.send(line);
        });

        match result {
            Ok(()) => {
                self.pending_saves += 1;
                writeln!(out, "saving…")?;
            }
            Err(SessionError::NoImageSelected) => {
                writeln!(out, "Whoops: {}", SessionError::NoImageSelected)?;
            }
        }
        self.drain_saves(out)
    }

    fn report<W: Write>(&self, outcome: RecomputeOutcome, out: &mut W) -> io::Result<()> {
        if outcome == RecomputeOutcome::NoOutput {
            writeln!(out, "{} could not render; showing the previous result", self.session.label())?;
        }
        Ok(())
    }

    fn print_status<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "filter: {}", self.session.label())?;
        for slot in ParameterSlot::ALL {
            let mark = if self.session.variant().accepts(slot) { '*' } else { ' ' };
            writeln!(out, " {mark} {:<9} {}", slot.name(), self.session.parameter(slot))?;
        }
        match self.session.output() {
            Some(img) => writeln!(out, "picture: {}x{}", img.width(), img.height()),
            None => writeln!(out, "picture: none (use `open <path>`)"),
        }
    }

    fn drain_saves<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        while let Ok(line) = self.save_rx.try_recv() {
            self.pending_saves = self.pending_saves.saturating_sub(1);
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    fn finish_saves<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        while self.pending_saves > 0 {
            match self.save_rx.recv() {
                Ok(line) => {
                    self.pending_saves -= 1;
                    writeln!(out, "{line}")?;
                }
                Err(_) => break,
            }
        }
        Ok(())
    }
}
