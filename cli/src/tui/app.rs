use meterboard_core::{
    today, DashboardOutcome, DashboardRequest, DashboardService, DashboardUseCase, ObservationForm,
    SubmitOutcome,
};

use crate::Store;

pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub service: DashboardService<Store>,
    pub request: DashboardRequest,
    pub outcome: DashboardOutcome,
    pub input: String,
    pub input_mode: InputMode,
    pub cursor_position: usize,
    pub status: Option<String>,
}

impl App {
    pub fn new(service: DashboardService<Store>, request: DashboardRequest) -> App {
        let mut app = App {
            service,
            request,
            outcome: DashboardOutcome::Unavailable("Loading".to_string()),
            input: String::new(),
            input_mode: InputMode::Normal,
            cursor_position: 0,
            status: None,
        };
        app.refresh();
        app
    }

    pub fn refresh(&mut self) {
        self.outcome = DashboardUseCase::new(&mut self.service).render(&self.request);
    }

    pub fn next_window(&mut self) {
        self.request.shift(1);
        self.refresh();
    }

    pub fn previous_window(&mut self) {
        self.request.shift(-1);
        self.refresh();
    }

    pub fn widen(&mut self) {
        self.request.widen(7);
        self.refresh();
    }

    pub fn narrow(&mut self) {
        self.request.widen(-7);
        self.refresh();
    }

    pub fn jump_to_today(&mut self) {
        self.request = DashboardRequest {
            view_mode: self.request.view_mode,
            package: self.request.package.clone(),
            ..DashboardRequest::trailing(today(), self.request.span_days() as u32)
        };
        self.refresh();
    }

    pub fn cycle_package(&mut self) {
        self.request.package = self.service.catalog().cycle(self.request.package.as_deref());
        self.refresh();
    }

    pub fn cycle_view(&mut self) {
        self.request.view_mode = self.request.view_mode.next();
        self.refresh();
    }

    pub fn package_label(&self) -> &str {
        self.request.package.as_deref().unwrap_or("All packages")
    }

    pub fn enter_edit_mode(&mut self) {
        self.input_mode = InputMode::Editing;
        self.input.clear();
        self.cursor_position = 0;
        self.status = Some("date:today pkg:TN-95 wc:0 dt:0 ci:0 mi:0 inhouse:0 sup:0".to_string());
    }

    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn input_char(&mut self, c: char) {
        let byte_index = self.input.chars().take(self.cursor_position).map(|c| c.len_utf8()).sum();
        self.input.insert(byte_index, c);
        self.cursor_position += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            let byte_index: usize = self.input.chars().take(self.cursor_position - 1).map(|c| c.len_utf8()).sum();
            self.input.remove(byte_index);
            self.cursor_position -= 1;
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input.chars().count() {
            self.cursor_position += 1;
        }
    }

    pub fn submit_command(&mut self) {
        if self.input.trim().is_empty() {
            self.status = None;
            self.exit_input_mode();
            return;
        }

        let args: Vec<String> = self.input.split_whitespace().map(|s| s.to_string()).collect();
        let (form, warnings) = ObservationForm::from_args(&args);
        let outcome = DashboardUseCase::new(&mut self.service).submit(&form, today());

        let mut message = outcome.message();
        if !warnings.is_empty() {
            message = format!("{} ({})", message, warnings.join("; "));
        }
        self.status = Some(message);

        if let SubmitOutcome::Saved(_) = outcome {
            self.refresh();
        }

        self.input.clear();
        self.cursor_position = 0;
        self.exit_input_mode();
    }
}
