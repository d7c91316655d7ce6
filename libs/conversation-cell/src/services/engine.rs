use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use booking_cell::models::{Booking, BookingError, ReserveRequest};
use booking_cell::services::availability::{weekday_index, AvailabilityService};
use booking_cell::services::ledger::BookingLedgerService;
use booking_cell::services::notifier::Notifier;
use catalog_cell::services::catalog::CatalogService;
use shared_config::AppConfig;

use crate::models::{
    is_valid_phone, ConversationError, ConversationState, Prompt, ServiceChoice, StepInput,
    StoredConversation, WidgetReserveRequest,
};
use crate::services::codes::ConfirmationCodeService;
use crate::services::stores::{CodeStore, ConversationStore};

/// Drives the step-by-step booking dialogue. Each accepted input moves
/// the persisted state one step forward and returns the next prompt;
/// input that does not fit the current step re-issues the prompt for it.
pub struct ConversationEngine {
    store: Arc<dyn ConversationStore>,
    codes: ConfirmationCodeService,
    catalog: CatalogService,
    availability: AvailabilityService,
    ledger: BookingLedgerService,
    notifier: Arc<dyn Notifier>,
    booking_window_days: i64,
    code_ttl_minutes: i64,
}

impl ConversationEngine {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn ConversationStore>,
        code_store: Arc<dyn CodeStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            codes: ConfirmationCodeService::new(code_store, config.code_ttl_minutes),
            catalog: CatalogService::new(config),
            availability: AvailabilityService::new(config),
            ledger: BookingLedgerService::new(config, notifier.clone()),
            notifier,
            booking_window_days: config.booking_window_days,
            code_ttl_minutes: config.code_ttl_minutes,
        }
    }

    pub async fn handle(
        &self,
        client_id: &str,
        input: StepInput,
    ) -> Result<Prompt, ConversationError> {
        self.handle_at(client_id, input, Utc::now()).await
    }

    pub async fn handle_at(
        &self,
        client_id: &str,
        input: StepInput,
        now: DateTime<Utc>,
    ) -> Result<Prompt, ConversationError> {
        match input {
            StepInput::StartBooking => self.start(client_id, now).await,
            StepInput::CancelFlow => {
                self.store.clear(client_id).await?;
                self.codes.revoke(client_id).await?;
                Ok(Prompt::FlowCancelled)
            }
            other => match self.store.load(client_id).await? {
                Some(stored) => self.step(client_id, stored.state, other, now).await,
                None => Ok(Prompt::Idle),
            },
        }
    }

    /// Starting over always resets: any half-finished flow and any
    /// outstanding code for this client are discarded.
    async fn start(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Prompt, ConversationError> {
        self.codes.revoke(client_id).await?;
        self.store
            .save(
                client_id,
                &StoredConversation {
                    state: ConversationState::ChoosingService,
                    created_at: now,
                },
            )
            .await?;

        debug!("Client {} started a booking flow", client_id);
        self.choose_service_prompt().await
    }

    async fn step(
        &self,
        client_id: &str,
        state: ConversationState,
        input: StepInput,
        now: DateTime<Utc>,
    ) -> Result<Prompt, ConversationError> {
        match (state, input) {
            (ConversationState::ChoosingService, StepInput::Service { service_id }) => {
                let service = self.catalog.get_service(service_id).await?;
                self.save_state(
                    client_id,
                    ConversationState::ChoosingProvider {
                        service: ServiceChoice {
                            service_id,
                            duration_minutes: service.duration_minutes,
                        },
                    },
                    now,
                )
                .await?;
                self.choose_provider_prompt().await
            }

            (
                ConversationState::ChoosingProvider { service },
                StepInput::Provider { provider_id },
            ) => {
                self.catalog.get_provider(provider_id).await?;
                self.save_state(
                    client_id,
                    ConversationState::ChoosingDate {
                        service,
                        provider_id,
                    },
                    now,
                )
                .await?;
                self.choose_date_prompt(provider_id, now).await
            }

            (
                ConversationState::ChoosingDate {
                    service,
                    provider_id,
                },
                StepInput::Date { date },
            ) => {
                self.validate_date(provider_id, date, now).await?;
                self.save_state(
                    client_id,
                    ConversationState::ChoosingTime {
                        service,
                        provider_id,
                        date,
                    },
                    now,
                )
                .await?;
                self.choose_time_prompt(provider_id, date, &service).await
            }

            (
                ConversationState::ChoosingTime {
                    service,
                    provider_id,
                    date,
                },
                StepInput::Time { time },
            ) => {
                let free = self
                    .availability
                    .free_slots(provider_id, date, service.duration_minutes)
                    .await?;
                if !free.contains(&time) {
                    return Err(ConversationError::Validation(
                        "that time is not available".to_string(),
                    ));
                }

                self.save_state(
                    client_id,
                    ConversationState::EnteringPhone {
                        service,
                        provider_id,
                        date,
                        time,
                    },
                    now,
                )
                .await?;
                Ok(Prompt::EnterPhone)
            }

            (
                ConversationState::EnteringPhone {
                    service,
                    provider_id,
                    date,
                    time,
                },
                StepInput::Text { text },
            ) => {
                let phone = text.trim().to_string();
                if !is_valid_phone(&phone) {
                    return Err(ConversationError::Validation(
                        "phone must be in international format, e.g. +79161234567".to_string(),
                    ));
                }

                let code = self.codes.issue(client_id, now).await?;
                self.deliver_code(client_id, &code.code).await;

                self.save_state(
                    client_id,
                    ConversationState::EnteringCode {
                        service,
                        provider_id,
                        date,
                        time,
                        phone: phone.clone(),
                    },
                    now,
                )
                .await?;
                Ok(Prompt::EnterCode { phone })
            }

            (
                ConversationState::EnteringCode {
                    service,
                    provider_id,
                    date,
                    time,
                    ..
                },
                StepInput::Text { text },
            ) => {
                if !self.codes.verify(client_id, text.trim(), now).await? {
                    return Err(ConversationError::Validation(
                        "invalid or expired confirmation code".to_string(),
                    ));
                }

                let request = ReserveRequest {
                    client_id: client_id.to_string(),
                    provider_id,
                    service_id: service.service_id,
                    date,
                    time,
                };
                match self.ledger.reserve(request, false).await {
                    Ok(booking) => {
                        self.store.clear(client_id).await?;
                        Ok(Prompt::BookingPlaced {
                            booking_id: booking.id,
                        })
                    }
                    // someone took the slot mid-flow, fall back to time choice
                    Err(BookingError::SlotTaken) => {
                        self.save_state(
                            client_id,
                            ConversationState::ChoosingTime {
                                service,
                                provider_id,
                                date,
                            },
                            now,
                        )
                        .await?;
                        self.choose_time_prompt(provider_id, date, &service).await
                    }
                    Err(e) => Err(e.into()),
                }
            }

            (state, _) => self.prompt_for(&state, now).await,
        }
    }

    /// Widget entry point: validate the phone and send it a code.
    pub async fn widget_issue_code(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ConversationError> {
        if !is_valid_phone(phone) {
            return Err(ConversationError::Validation(
                "phone must be in international format, e.g. +79161234567".to_string(),
            ));
        }

        let code = self.codes.issue(phone, now).await?;
        self.deliver_code(phone, &code.code).await;
        Ok(())
    }

    /// Widget booking: the code was delivered out of band, so a valid
    /// code means the booking is confirmed immediately.
    pub async fn widget_reserve(
        &self,
        request: WidgetReserveRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking, ConversationError> {
        if !self.codes.verify(&request.phone, request.code.trim(), now).await? {
            return Err(ConversationError::Validation(
                "invalid or expired confirmation code".to_string(),
            ));
        }

        let booking = self
            .ledger
            .reserve(
                ReserveRequest {
                    client_id: request.phone,
                    provider_id: request.provider_id,
                    service_id: request.service_id,
                    date: request.date,
                    time: request.time,
                },
                true,
            )
            .await?;

        Ok(booking)
    }

    async fn validate_date(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), ConversationError> {
        let today = now.date_naive();
        let last = today + Duration::days(self.booking_window_days);
        if date < today || date > last {
            return Err(ConversationError::Validation(format!(
                "date must be between {} and {}",
                today, last
            )));
        }

        let working = self
            .catalog
            .schedule_for_weekday(provider_id, weekday_index(date))
            .await?
            .map(|s| s.is_working_day)
            .unwrap_or(false);
        if !working {
            return Err(ConversationError::Validation(
                "the provider does not work on that day".to_string(),
            ));
        }

        Ok(())
    }

    async fn save_state(
        &self,
        client_id: &str,
        state: ConversationState,
        now: DateTime<Utc>,
    ) -> Result<(), ConversationError> {
        self.store
            .save(
                client_id,
                &StoredConversation {
                    state,
                    created_at: now,
                },
            )
            .await
    }

    async fn deliver_code(&self, recipient: &str, code: &str) {
        let text = format!(
            "Your confirmation code is {}. It is valid for {} minutes.",
            code, self.code_ttl_minutes
        );
        if let Err(e) = self.notifier.send(recipient, &text).await {
            warn!("Failed to deliver confirmation code to {}: {}", recipient, e);
        }
    }

    async fn prompt_for(
        &self,
        state: &ConversationState,
        now: DateTime<Utc>,
    ) -> Result<Prompt, ConversationError> {
        match state {
            ConversationState::ChoosingService => self.choose_service_prompt().await,
            ConversationState::ChoosingProvider { .. } => self.choose_provider_prompt().await,
            ConversationState::ChoosingDate { provider_id, .. } => {
                self.choose_date_prompt(*provider_id, now).await
            }
            ConversationState::ChoosingTime {
                service,
                provider_id,
                date,
            } => self.choose_time_prompt(*provider_id, *date, service).await,
            ConversationState::EnteringPhone { .. } => Ok(Prompt::EnterPhone),
            ConversationState::EnteringCode { phone, .. } => Ok(Prompt::EnterCode {
                phone: phone.clone(),
            }),
        }
    }

    async fn choose_service_prompt(&self) -> Result<Prompt, ConversationError> {
        let services = self.catalog.services_by_category().await?;
        Ok(Prompt::ChooseService { services })
    }

    async fn choose_provider_prompt(&self) -> Result<Prompt, ConversationError> {
        let providers = self.catalog.list_providers().await?;
        Ok(Prompt::ChooseProvider { providers })
    }

    async fn choose_date_prompt(
        &self,
        provider_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Prompt, ConversationError> {
        let schedules = self.catalog.schedules_for_provider(provider_id).await?;
        let working: HashSet<u8> = schedules
            .iter()
            .filter(|s| s.is_working_day)
            .map(|s| s.weekday)
            .collect();

        let today = now.date_naive();
        let dates: Vec<NaiveDate> = (0..=self.booking_window_days)
            .map(|offset| today + Duration::days(offset))
            .filter(|date| working.contains(&weekday_index(*date)))
            .collect();

        Ok(Prompt::ChooseDate { dates })
    }

    async fn choose_time_prompt(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        service: &ServiceChoice,
    ) -> Result<Prompt, ConversationError> {
        let slots = self
            .availability
            .free_slots(provider_id, date, service.duration_minutes)
            .await?;
        let times = slots.iter().map(|t| t.format("%H:%M").to_string()).collect();

        Ok(Prompt::ChooseTime { times })
    }
}
